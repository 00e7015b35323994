//! # Signet shapes for OneBot v11
//!
//! This crate supplies the OneBot v11 side of a Signet dispatcher:
//!
//! - [`OneBotKeyExtractor`] reads `post_type` and the family detail field
//!   (`message_type`, `notice_type`, ...) into an [`EventKey`](signet_core::EventKey)
//! - [`register_standard`] registers the shape table, including guild notices
//! - typed views ([`GroupMessage`], [`ChannelUpdatedNotice`], ...) read decoded
//!   events through [`TypedEvent::view`](signet_core::TypedEvent::view)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use signet_core::prelude::*;
//! use signet_onebot::{ChannelUpdatedNotice, GroupMessage};
//!
//! let dispatcher = signet_onebot::dispatcher()?;
//!
//! dispatcher.handlers().subscribe(
//!     EventKey::message("", "group"),
//!     sync_handler(|ctx| {
//!         let msg: GroupMessage = ctx.view()?;
//!         println!("{}: {}", msg.sender.display_name(), msg.plain_text());
//!         Ok(())
//!     }),
//! );
//!
//! dispatcher.ingest_str(&line).await;
//! ```

pub mod envelope;
pub mod model;

use signet_core::{Dispatcher, DispatcherBuilder, DuplicateKeyError};
use tracing::debug;

pub use envelope::OneBotKeyExtractor;
pub use model::*;

/// A dispatcher builder over the standard shapes and the OneBot envelope.
pub fn dispatcher_builder() -> Result<DispatcherBuilder, DuplicateKeyError> {
    let schemas = standard_registry()?;
    debug!(shapes = schemas.len(), "OneBot shape table loaded");
    Ok(Dispatcher::builder(schemas).extractor(OneBotKeyExtractor))
}

/// A dispatcher over the standard shapes with default settings.
pub fn dispatcher() -> Result<Dispatcher, DuplicateKeyError> {
    Ok(dispatcher_builder()?.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use signet_core::prelude::*;
    use signet_core::{CollectingSink, IngestOutcome, sync_handler};

    #[tokio::test]
    async fn test_channel_updated_end_to_end() {
        let dispatcher = dispatcher().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let exact = Arc::clone(&seen);
        dispatcher.handlers().subscribe(
            EventKey::notice("guild", "channel_updated"),
            sync_handler(move |ctx| {
                let notice: ChannelUpdatedNotice = ctx.view()?;
                exact.lock().push(format!(
                    "exact {} {} {} {}",
                    notice.guild_id, notice.channel_id, notice.operator_id, notice.new_info.channel_name
                ));
                Ok(())
            }),
        );
        let any = Arc::clone(&seen);
        dispatcher.handlers().subscribe(
            Topic::Any,
            sync_handler(move |ctx| {
                any.lock().push(format!("any {}", ctx.name()));
                Ok(())
            }),
        );

        let outcome = dispatcher
            .ingest_value(json!({
                "post_type": "notice",
                "sub_type": "guild",
                "detail_type": "channel_updated",
                "guild_id": "123",
                "channel_id": "456",
                "operator_id": "789",
                "old_info": {"channel_name": "old"},
                "new_info": {"channel_name": "new"}
            }))
            .await;

        assert_eq!(outcome.report().map(|r| r.invoked), Some(2));
        assert_eq!(
            *seen.lock(),
            ["exact 123 456 789 new", "any notice.guild.channel_updated"]
        );
    }

    #[tokio::test]
    async fn test_group_message_view() {
        let dispatcher = dispatcher().unwrap();
        let text = Arc::new(Mutex::new(String::new()));

        let out = Arc::clone(&text);
        dispatcher.handlers().subscribe(
            EventKey::message("", "group"),
            sync_handler(move |ctx| {
                let msg: GroupMessage = ctx.view()?;
                *out.lock() = format!("{}: {}", msg.sender.display_name(), msg.plain_text());
                Ok(())
            }),
        );

        let outcome = dispatcher
            .ingest_str(
                r#"{"post_type":"message","message_type":"group","sub_type":"normal",
                    "time":1700000000,"self_id":10001,"message_id":42,"group_id":20002,
                    "user_id":30003,"raw_message":"hi",
                    "message":[{"type":"text","data":{"text":"hi"}}],
                    "sender":{"user_id":30003,"nickname":"alice","card":"Al"}}"#,
            )
            .await;

        assert!(outcome.is_dispatched());
        assert_eq!(*text.lock(), "Al: hi");
    }

    #[tokio::test]
    async fn test_group_message_cq_string_plain_text() {
        let dispatcher = dispatcher().unwrap();
        let text = Arc::new(Mutex::new(None));

        let out = Arc::clone(&text);
        dispatcher.handlers().subscribe(
            EventKey::message("", "group"),
            sync_handler(move |ctx| {
                let msg: GroupMessage = ctx.view()?;
                *out.lock() = Some(msg.plain_text());
                Ok(())
            }),
        );

        dispatcher
            .ingest_value(json!({
                "post_type": "message",
                "message_type": "group",
                "message_id": 7,
                "group_id": 20002,
                "user_id": 30003,
                "message": "hello [CQ:face,id=178] world"
            }))
            .await;

        assert_eq!(text.lock().as_deref(), Some("hello  world"));
    }

    #[tokio::test]
    async fn test_failures_reach_the_sink() {
        let sink = Arc::new(CollectingSink::new());
        let dispatcher = dispatcher_builder()
            .unwrap()
            .sink(Arc::clone(&sink))
            .build();

        let missing = dispatcher
            .ingest_value(json!({
                "post_type": "request",
                "request_type": "friend",
                "user_id": 1
            }))
            .await;
        assert_eq!(
            missing,
            IngestOutcome::DecodeFailed(EventKey::request("", "friend"))
        );

        let unknown = dispatcher
            .ingest_value(json!({"post_type": "notice", "notice_type": "mystery"}))
            .await;
        assert!(matches!(unknown, IngestOutcome::Unresolved(_)));

        assert_eq!(sink.kinds(), ["decode", "unknown_shape"]);
    }

    #[tokio::test]
    async fn test_handler_stops_message_propagation() {
        let dispatcher = dispatcher().unwrap();
        let calls = Arc::new(Mutex::new(0));

        dispatcher.handlers().subscribe(
            EventKey::message("", "private"),
            sync_handler(|ctx| {
                ctx.stop_propagation();
                Ok(())
            }),
        );
        let counter = Arc::clone(&calls);
        dispatcher.handlers().subscribe(
            Topic::Any,
            sync_handler(move |_| {
                *counter.lock() += 1;
                Ok(())
            }),
        );

        let outcome = dispatcher
            .ingest_value(json!({
                "post_type": "message",
                "message_type": "private",
                "sub_type": "friend",
                "message_id": 1,
                "user_id": 2
            }))
            .await;

        assert!(outcome.report().is_some_and(|r| r.stopped));
        assert_eq!(*calls.lock(), 0);
    }
}
