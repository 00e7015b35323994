//! Meta event shapes: `meta_event/*/lifecycle` and `meta_event/*/heartbeat`.

use signet_core::{EventDescriptor, EventKey, FieldType, Schema};
use signet_macros::FromRecord;

use crate::model::types::header;

fn status() -> Schema {
    Schema::builder()
        .optional("app_initialized", FieldType::Bool)
        .optional("app_enabled", FieldType::Bool)
        .optional("app_good", FieldType::Bool)
        .optional("online", FieldType::Bool)
        .optional("good", FieldType::Bool)
        .build()
}

pub(crate) fn descriptors() -> Vec<EventDescriptor> {
    vec![
        EventDescriptor::new(
            EventKey::meta("", "lifecycle"),
            "meta_event.lifecycle",
            header().optional("sub_type", FieldType::String).build(),
        ),
        EventDescriptor::new(
            EventKey::meta("", "heartbeat"),
            "meta_event.heartbeat",
            header()
                .optional("status", FieldType::record(status()))
                .optional("interval", FieldType::Int)
                .build(),
        ),
    ]
}

/// Heartbeat status.
#[derive(Debug, Clone, Default, PartialEq, FromRecord)]
pub struct HeartbeatStatus {
    pub app_initialized: bool,
    pub app_enabled: bool,
    pub app_good: bool,
    pub online: bool,
    pub good: bool,
}

/// Heartbeat.
#[derive(Debug, Clone, PartialEq, FromRecord)]
pub struct Heartbeat {
    pub status: HeartbeatStatus,
    /// Milliseconds until the next heartbeat.
    pub interval: i64,
}

/// Lifecycle change.
#[derive(Debug, Clone, PartialEq, FromRecord)]
pub struct Lifecycle {
    /// "enable", "disable" or "connect".
    pub sub_type: String,
}
