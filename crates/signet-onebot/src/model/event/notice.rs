//! Notice shapes.
//!
//! Most notices are keyed without a sub-type (`notice/*/group_ban` matches
//! `ban` and `lift_ban` alike); the sub-type stays readable as a field.
//! Notify notices are keyed by sub-type:
//!
//! ```text
//! notice/*/group_upload     notice/*/friend_add      notice/poke/notify
//! notice/*/group_admin      notice/*/group_recall    notice/lucky_king/notify
//! notice/*/group_decrease   notice/*/friend_recall   notice/honor/notify
//! notice/*/group_increase   notice/*/group_card      notice/*/notify
//! notice/*/group_ban        notice/*/essence
//! notice/*/offline_file     notice/*/client_status
//! ```
//!
//! `notice/*/notify` catches notify sub-types without a dedicated shape.

use signet_core::{EventDescriptor, EventKey, FieldType, Id, Schema};
use signet_macros::FromRecord;

use crate::model::types::header;

fn uploaded_file() -> Schema {
    Schema::builder()
        .required("id", FieldType::String)
        .required("name", FieldType::String)
        .optional("size", FieldType::Int)
        .optional("busid", FieldType::Int)
        .build()
}

fn offline_file() -> Schema {
    Schema::builder()
        .required("name", FieldType::String)
        .optional("size", FieldType::Int)
        .optional("url", FieldType::String)
        .build()
}

fn device() -> Schema {
    Schema::builder()
        .optional("app_id", FieldType::Int)
        .optional("device_name", FieldType::String)
        .optional("device_kind", FieldType::String)
        .build()
}

fn notice(detail: &str, schema: Schema) -> EventDescriptor {
    EventDescriptor::new(
        EventKey::notice("", detail),
        format!("notice.{detail}"),
        schema,
    )
}

fn notify(sub: &str, schema: Schema) -> EventDescriptor {
    EventDescriptor::new(
        EventKey::notice(sub, "notify"),
        format!("notice.notify.{sub}"),
        schema,
    )
}

pub(crate) fn descriptors() -> Vec<EventDescriptor> {
    let group_member = || {
        header()
            .required("group_id", FieldType::Id)
            .required("user_id", FieldType::Id)
    };
    let notify_common = || {
        header()
            .optional("group_id", FieldType::Id)
            .required("user_id", FieldType::Id)
            .optional("sub_type", FieldType::String)
    };

    vec![
        notice(
            "group_upload",
            group_member()
                .required("file", FieldType::record(uploaded_file()))
                .build(),
        ),
        notice(
            "group_admin",
            group_member()
                .optional("sub_type", FieldType::String)
                .build(),
        ),
        notice(
            "group_decrease",
            group_member()
                .optional("operator_id", FieldType::Id)
                .optional("sub_type", FieldType::String)
                .build(),
        ),
        notice(
            "group_increase",
            group_member()
                .optional("operator_id", FieldType::Id)
                .optional("sub_type", FieldType::String)
                .build(),
        ),
        notice(
            "group_ban",
            group_member()
                .optional("operator_id", FieldType::Id)
                .required("duration", FieldType::Int)
                .optional("sub_type", FieldType::String)
                .build(),
        ),
        notice(
            "friend_add",
            header().required("user_id", FieldType::Id).build(),
        ),
        notice(
            "group_recall",
            group_member()
                .optional("operator_id", FieldType::Id)
                .required("message_id", FieldType::Id)
                .build(),
        ),
        notice(
            "friend_recall",
            header()
                .required("user_id", FieldType::Id)
                .required("message_id", FieldType::Id)
                .build(),
        ),
        notice(
            "group_card",
            group_member()
                .optional("card_new", FieldType::String)
                .optional("card_old", FieldType::String)
                .build(),
        ),
        notice(
            "offline_file",
            header()
                .required("user_id", FieldType::Id)
                .required("file", FieldType::record(offline_file()))
                .build(),
        ),
        notice(
            "client_status",
            header()
                .optional("online", FieldType::Bool)
                .optional("client", FieldType::record(device()))
                .build(),
        ),
        notice(
            "essence",
            header()
                .required("group_id", FieldType::Id)
                .required("sender_id", FieldType::Id)
                .required("operator_id", FieldType::Id)
                .required("message_id", FieldType::Id)
                .optional("sub_type", FieldType::String)
                .build(),
        ),
        notify(
            "poke",
            notify_common()
                .required("target_id", FieldType::Id)
                .build(),
        ),
        notify(
            "lucky_king",
            notify_common()
                .required("target_id", FieldType::Id)
                .build(),
        ),
        notify(
            "honor",
            notify_common()
                .required("honor_type", FieldType::String)
                .build(),
        ),
        notice("notify", notify_common().build()),
    ]
}

// ============================================================================
// Views
// ============================================================================

/// Group ban or lift.
#[derive(Debug, Clone, FromRecord)]
pub struct GroupBanNotice {
    pub group_id: Id,
    pub user_id: Id,
    pub operator_id: Id,
    /// Seconds; 0 lifts the ban.
    pub duration: i64,
    pub sub_type: String,
}

/// Group message recall.
#[derive(Debug, Clone, FromRecord)]
pub struct GroupRecallNotice {
    pub group_id: Id,
    pub user_id: Id,
    pub operator_id: Id,
    pub message_id: Id,
}

/// Poke (nudge) in a group or a private chat.
#[derive(Debug, Clone, FromRecord)]
pub struct PokeNotify {
    /// Empty for private pokes.
    pub group_id: Id,
    pub user_id: Id,
    pub target_id: Id,
}

/// Group honor change.
#[derive(Debug, Clone, FromRecord)]
pub struct HonorNotify {
    pub group_id: Id,
    pub user_id: Id,
    /// "talkative", "performer" or "emotion".
    pub honor_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_shapes_keyed_by_sub_type() {
        let keys: Vec<_> = descriptors()
            .iter()
            .filter(|d| d.key().detail_type() == "notify")
            .map(|d| d.key().sub_type().to_string())
            .collect();
        assert_eq!(keys, ["poke", "lucky_king", "honor", ""]);
    }
}
