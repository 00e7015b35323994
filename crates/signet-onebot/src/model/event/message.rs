//! Message shapes.
//!
//! | Key | Name |
//! |-----|------|
//! | `message/*/private` | `message.private` |
//! | `message/*/group` | `message.group` |
//! | `message/*/guild` | `message.guild` |
//!
//! Messages are cancellable: a handler may stop the remaining handlers from
//! seeing a message it has answered.

use serde_json::Value;
use signet_core::{EventDescriptor, EventKey, FieldType, Id, SchemaBuilder};
use signet_macros::FromRecord;

use crate::model::types::{Anonymous, Sender, anonymous, header, sender};

fn common() -> SchemaBuilder {
    header()
        .required("message_id", FieldType::Id)
        .required("user_id", FieldType::Id)
        .optional("message", FieldType::Json)
        .optional("raw_message", FieldType::String)
        .optional("font", FieldType::Int)
        .optional("sender", FieldType::record(sender()))
        .optional("sub_type", FieldType::String)
}

pub(crate) fn descriptors() -> Vec<EventDescriptor> {
    vec![
        EventDescriptor::new(
            EventKey::message("", "private"),
            "message.private",
            common()
                .optional("temp_source", FieldType::Int)
                .build(),
        )
        .cancellable(true),
        EventDescriptor::new(
            EventKey::message("", "group"),
            "message.group",
            common()
                .required("group_id", FieldType::Id)
                .optional("anonymous", FieldType::record(anonymous()))
                .build(),
        )
        .cancellable(true),
        EventDescriptor::new(
            EventKey::message("", "guild"),
            "message.guild",
            common()
                .required("guild_id", FieldType::Id)
                .required("channel_id", FieldType::Id)
                .optional("self_tiny_id", FieldType::Id)
                .build(),
        )
        .cancellable(true),
    ]
}

/// Returns the text of a message, in array or CQ-string format.
///
/// Non-text segments and `[CQ:...]` codes are dropped.
pub fn extract_plain_text(message: &Value) -> String {
    match message {
        Value::Array(segments) => segments
            .iter()
            .filter_map(|seg| {
                if seg.get("type")?.as_str()? == "text" {
                    seg.get("data")?.get("text")?.as_str().map(String::from)
                } else {
                    None
                }
            })
            .collect::<String>(),
        Value::String(cq) => cq_plain_text(cq),
        _ => String::new(),
    }
}

const CQ_START: &str = "[CQ:";

/// Text between the CQ codes of a CQ string, unescaped.
fn cq_plain_text(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(CQ_START) {
        text.push_str(&unescape_cq(&rest[..start]));
        rest = &rest[start + CQ_START.len()..];
        // An unterminated code runs to the end.
        rest = match rest.find(']') {
            Some(end) => &rest[end + 1..],
            None => "",
        };
    }
    text.push_str(&unescape_cq(rest));
    text
}

fn unescape_cq(text: &str) -> String {
    text.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

// ============================================================================
// Views
// ============================================================================

/// Private message.
#[derive(Debug, Clone, FromRecord)]
pub struct PrivateMessage {
    pub time: i64,
    pub self_id: Id,
    pub message_id: Id,
    pub user_id: Id,
    pub message: Value,
    pub raw_message: String,
    pub sender: Sender,
    /// "friend", "group" or "other".
    pub sub_type: String,
}

impl PrivateMessage {
    pub fn plain_text(&self) -> String {
        extract_plain_text(&self.message)
    }
}

/// Group message.
#[derive(Debug, Clone, FromRecord)]
pub struct GroupMessage {
    pub time: i64,
    pub self_id: Id,
    pub message_id: Id,
    pub group_id: Id,
    pub user_id: Id,
    pub message: Value,
    pub raw_message: String,
    pub sender: Sender,
    pub anonymous: Anonymous,
    /// "normal", "anonymous" or "notice".
    pub sub_type: String,
}

impl GroupMessage {
    pub fn plain_text(&self) -> String {
        extract_plain_text(&self.message)
    }
}

/// Guild channel message.
#[derive(Debug, Clone, FromRecord)]
pub struct GuildMessage {
    pub guild_id: Id,
    pub channel_id: Id,
    pub message_id: Id,
    pub user_id: Id,
    pub message: Value,
    pub sender: Sender,
    pub self_tiny_id: Id,
}

impl GuildMessage {
    pub fn plain_text(&self) -> String {
        extract_plain_text(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_text() {
        let message = json!([
            {"type": "text", "data": {"text": "hello "}},
            {"type": "face", "data": {"id": "1"}},
            {"type": "text", "data": {"text": "world"}}
        ]);
        assert_eq!(extract_plain_text(&message), "hello world");
        assert_eq!(extract_plain_text(&json!(42)), "");
    }

    #[test]
    fn test_extract_plain_text_from_cq_string() {
        assert_eq!(
            extract_plain_text(&json!("hello [CQ:face,id=178] world")),
            "hello  world"
        );
        assert_eq!(
            extract_plain_text(&json!("[CQ:at,qq=10001]&#91;ok&#93; a&#44;b &amp;c")),
            "[ok] a,b &c"
        );
        assert_eq!(extract_plain_text(&json!("plain")), "plain");
        assert_eq!(extract_plain_text(&json!("tail [CQ:image,file=a.png")), "tail ");
    }

    #[test]
    fn test_message_shapes_are_cancellable() {
        assert!(descriptors().iter().all(EventDescriptor::is_cancellable));
    }
}
