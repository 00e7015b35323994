//! OneBot v11 envelope layout.
//!
//! OneBot v11 names the detail discriminator after the post type:
//!
//! | `post_type` | Detail field |
//! |-------------|--------------|
//! | `message`, `message_sent` | `message_type` |
//! | `notice` | `notice_type` |
//! | `request` | `request_type` |
//! | `meta_event` | `meta_event_type` |
//!
//! A payload carrying `detail_type` uses the explicit layout instead.

use signet_core::integration::envelope::{discriminator, post_type};
use signet_core::{EnvelopeError, EventKey, KeyExtractor, PostType, RawMessage};

/// Reads event keys from OneBot v11 envelopes.
///
/// - `message_sent` is keyed as `message`, so self-sent messages reach the
///   message shapes.
/// - Guild notices that carry `guild_id` but no `sub_type` get sub-type
///   `guild`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneBotKeyExtractor;

impl OneBotKeyExtractor {
    fn detail_field(post: &str) -> String {
        match post {
            "message_sent" => "message_type".to_string(),
            other => format!("{other}_type"),
        }
    }
}

impl KeyExtractor for OneBotKeyExtractor {
    fn extract(&self, raw: &RawMessage) -> Result<EventKey, EnvelopeError> {
        let post = post_type(raw, "post_type")?;

        let detail = match discriminator(raw, "detail_type")? {
            Some(explicit) => explicit,
            None => discriminator(raw, &Self::detail_field(post))?.unwrap_or_default(),
        };
        let mut sub = discriminator(raw, "sub_type")?.unwrap_or_default();

        let post = match PostType::from(post) {
            PostType::MessageSent => PostType::Message,
            other => other,
        };
        if post == PostType::Notice && sub.is_empty() && raw.get("guild_id").is_some() {
            sub = "guild";
        }

        Ok(EventKey::new(post, sub, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(value: serde_json::Value) -> Result<EventKey, EnvelopeError> {
        OneBotKeyExtractor.extract(&RawMessage::from_value(value).unwrap())
    }

    #[test]
    fn test_family_detail_fields() {
        assert_eq!(
            key(json!({"post_type": "message", "message_type": "group", "sub_type": "normal"}))
                .unwrap(),
            EventKey::message("normal", "group")
        );
        assert_eq!(
            key(json!({"post_type": "meta_event", "meta_event_type": "heartbeat"})).unwrap(),
            EventKey::meta("", "heartbeat")
        );
        assert_eq!(
            key(json!({"post_type": "request", "request_type": "group", "sub_type": "invite"}))
                .unwrap(),
            EventKey::request("invite", "group")
        );
    }

    #[test]
    fn test_message_sent_is_a_message() {
        assert_eq!(
            key(json!({"post_type": "message_sent", "message_type": "private"})).unwrap(),
            EventKey::message("", "private")
        );
    }

    #[test]
    fn test_explicit_layout_wins() {
        assert_eq!(
            key(json!({
                "post_type": "notice",
                "sub_type": "guild",
                "detail_type": "channel_updated",
                "notice_type": "ignored"
            }))
            .unwrap(),
            EventKey::notice("guild", "channel_updated")
        );
    }

    #[test]
    fn test_guild_notice_without_sub_type() {
        assert_eq!(
            key(json!({"post_type": "notice", "notice_type": "channel_created", "guild_id": "1"}))
                .unwrap(),
            EventKey::notice("guild", "channel_created")
        );
    }

    #[test]
    fn test_invalid_envelopes() {
        assert!(matches!(
            key(json!({"message_type": "group"})),
            Err(EnvelopeError::MissingPostType { .. })
        ));
        assert!(matches!(
            key(json!({"post_type": "notice", "notice_type": 7})),
            Err(EnvelopeError::InvalidDiscriminator { .. })
        ));
    }
}
