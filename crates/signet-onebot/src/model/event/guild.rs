//! Guild (channel) notice shapes.
//!
//! Guild notices arrive under `notice/guild/<detail>`:
//!
//! | Detail | Payload |
//! |--------|---------|
//! | `channel_created` | `channel_info` |
//! | `channel_destroyed` | `channel_info` |
//! | `channel_updated` | `old_info`, `new_info` |
//! | `message_reactions_updated` | `message_id`, `current_reactions` |

use signet_core::{EventDescriptor, EventKey, FieldType, Id, Schema, SchemaBuilder};
use signet_macros::FromRecord;

use crate::model::types::header;

/// Slow-mode option of a channel.
pub fn slow_mode() -> Schema {
    Schema::builder()
        .optional("slow_mode_key", FieldType::Int)
        .optional("slow_mode_text", FieldType::String)
        .optional("speak_frequency", FieldType::Int)
        .optional("slow_mode_circle", FieldType::Int)
        .build()
}

/// Channel information as sent in guild notices.
pub fn channel_info() -> Schema {
    Schema::builder()
        .optional("owner_guild_id", FieldType::Id)
        .optional("channel_id", FieldType::Id)
        .optional("channel_type", FieldType::Int)
        .optional("channel_name", FieldType::String)
        .optional("create_time", FieldType::Int)
        .optional("creator_tiny_id", FieldType::Id)
        .optional("talk_permission", FieldType::Int)
        .optional("visible_type", FieldType::Int)
        .optional("current_slow_mode", FieldType::Int)
        .optional("slow_modes", FieldType::list(FieldType::record(slow_mode())))
        .build()
}

fn reaction() -> Schema {
    Schema::builder()
        .optional("emoji_id", FieldType::String)
        .optional("emoji_index", FieldType::Int)
        .optional("emoji_type", FieldType::Int)
        .optional("emoji_name", FieldType::String)
        .optional("count", FieldType::Int)
        .optional("clicked", FieldType::Bool)
        .build()
}

fn channel_common() -> SchemaBuilder {
    header()
        .required("guild_id", FieldType::Id)
        .required("channel_id", FieldType::Id)
}

fn guild_notice(detail: &str, schema: Schema) -> EventDescriptor {
    EventDescriptor::new(
        EventKey::notice("guild", detail),
        format!("notice.guild.{detail}"),
        schema,
    )
}

pub(crate) fn descriptors() -> Vec<EventDescriptor> {
    let lifecycle = || {
        channel_common()
            .required("operator_id", FieldType::Id)
            .optional("channel_info", FieldType::record(channel_info()))
            .build()
    };

    vec![
        guild_notice("channel_created", lifecycle()),
        guild_notice("channel_destroyed", lifecycle()),
        guild_notice(
            "channel_updated",
            channel_common()
                .required("operator_id", FieldType::Id)
                .optional("old_info", FieldType::record(channel_info()))
                .optional("new_info", FieldType::record(channel_info()))
                .build(),
        ),
        guild_notice(
            "message_reactions_updated",
            channel_common()
                .required("user_id", FieldType::Id)
                .required("message_id", FieldType::Id)
                .optional(
                    "current_reactions",
                    FieldType::list(FieldType::record(reaction())),
                )
                .build(),
        ),
    ]
}

// ============================================================================
// Views
// ============================================================================

/// Slow-mode option.
#[derive(Debug, Clone, Default, PartialEq, FromRecord)]
pub struct SlowModeInfo {
    pub slow_mode_key: i64,
    pub slow_mode_text: String,
    /// Messages allowed per `slow_mode_circle` seconds.
    pub speak_frequency: i64,
    pub slow_mode_circle: i64,
}

/// Channel information.
#[derive(Debug, Clone, Default, PartialEq, FromRecord)]
pub struct ChannelInfo {
    pub owner_guild_id: Id,
    pub channel_id: Id,
    pub channel_type: i64,
    pub channel_name: String,
    pub create_time: i64,
    pub creator_tiny_id: Id,
    pub talk_permission: i64,
    pub visible_type: i64,
    pub current_slow_mode: i64,
    pub slow_modes: Vec<SlowModeInfo>,
}

/// A channel was updated. Both infos are empty when the implementation
/// omits them.
#[derive(Debug, Clone, PartialEq, FromRecord)]
pub struct ChannelUpdatedNotice {
    pub guild_id: Id,
    pub channel_id: Id,
    pub operator_id: Id,
    pub old_info: ChannelInfo,
    pub new_info: ChannelInfo,
}

impl ChannelUpdatedNotice {
    pub fn renamed(&self) -> bool {
        self.old_info.channel_name != self.new_info.channel_name
    }
}

/// A channel was created or destroyed.
#[derive(Debug, Clone, PartialEq, FromRecord)]
pub struct ChannelLifecycleNotice {
    pub guild_id: Id,
    pub channel_id: Id,
    pub operator_id: Id,
    pub channel_info: ChannelInfo,
}

/// One emoji reaction on a guild message.
#[derive(Debug, Clone, Default, PartialEq, FromRecord)]
pub struct Reaction {
    pub emoji_id: String,
    pub emoji_index: i64,
    pub emoji_type: i64,
    pub emoji_name: String,
    pub count: i64,
    pub clicked: bool,
}

/// Reactions on a guild message changed.
#[derive(Debug, Clone, PartialEq, FromRecord)]
pub struct ReactionsUpdatedNotice {
    pub guild_id: Id,
    pub channel_id: Id,
    pub user_id: Id,
    pub message_id: Id,
    pub current_reactions: Vec<Reaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use signet_core::{RawMessage, decode};
    use std::sync::Arc;

    fn updated() -> Arc<EventDescriptor> {
        let descriptor = descriptors()
            .into_iter()
            .find(|d| d.key().detail_type() == "channel_updated");
        Arc::new(descriptor.unwrap_or_else(|| panic!("channel_updated shape missing")))
    }

    #[test]
    fn test_channel_updated_view() {
        let raw = RawMessage::from_value(json!({
            "post_type": "notice",
            "notice_type": "channel_updated",
            "sub_type": "guild",
            "guild_id": "123",
            "channel_id": "456",
            "operator_id": 789,
            "old_info": {
                "channel_name": "lobby",
                "slow_modes": [
                    {"slow_mode_key": 0, "slow_mode_text": "off"},
                    {"slow_mode_key": 1, "speak_frequency": 1, "slow_mode_circle": 5}
                ]
            },
            "new_info": {"channel_name": "hall"}
        }))
        .unwrap();

        let event = decode(&raw, &updated()).unwrap();
        let notice: ChannelUpdatedNotice = event.view().unwrap();

        assert_eq!(notice.guild_id.as_str(), "123");
        assert_eq!(notice.operator_id.as_str(), "789");
        assert_eq!(notice.old_info.slow_modes.len(), 2);
        assert_eq!(notice.old_info.slow_modes[1].slow_mode_circle, 5);
        assert_eq!(notice.new_info.channel_name, "hall");
        assert!(notice.new_info.slow_modes.is_empty());
        assert!(notice.renamed());
    }

    #[test]
    fn test_channel_updated_without_infos() {
        let raw = RawMessage::from_value(json!({
            "post_type": "notice",
            "guild_id": "1",
            "channel_id": "2",
            "operator_id": "3"
        }))
        .unwrap();

        let notice: ChannelUpdatedNotice = decode(&raw, &updated()).unwrap().view().unwrap();
        assert_eq!(notice.old_info, ChannelInfo::default());
        assert!(!notice.renamed());
    }
}
