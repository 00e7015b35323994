//! Event dispatcher.
//!
//! The [`Dispatcher`] takes raw messages from the transport and runs each one
//! through the pipeline:
//!
//! 1. Extract the [`EventKey`] with the configured [`KeyExtractor`]
//! 2. Resolve the shape in the [`SchemaRegistry`]
//! 3. Decode the message into a [`TypedEvent`]
//! 4. Deliver the event through the [`HandlerRegistry`]
//!
//! A failure at any step is reported to the [`ErrorSink`] and ends the
//! pipeline for that message. `ingest` never fails; the returned
//! [`IngestOutcome`] is informational.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::builder(registry)
//!     .extractor(OneBotKeyExtractor::default())
//!     .handler_timeout(Some(Duration::from_secs(10)))
//!     .build();
//!
//! dispatcher.handlers().subscribe(EventKey::notice("guild", "channel_updated"), audit);
//!
//! while let Some(text) = transport.next().await {
//!     dispatcher.ingest_str(&text).await;
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{Instrument, Level, debug, span, trace};

use crate::error::DispatchError;
use crate::foundation::event::TypedEvent;
use crate::foundation::key::EventKey;
use crate::foundation::raw::RawMessage;
use crate::framework::decoder;
use crate::framework::registry::SchemaRegistry;
use crate::framework::subscription::{DispatchReport, HandlerRegistry};
use crate::integration::envelope::{FieldKeyExtractor, KeyExtractor};
use crate::integration::sink::{BoxedSink, ErrorSink, TracingSink};

/// What happened to one ingested message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The event was decoded and delivered.
    Dispatched {
        key: EventKey,
        report: DispatchReport,
    },
    /// The envelope could not be read.
    Malformed,
    /// No shape is registered for the key.
    Unresolved(EventKey),
    /// The payload did not match its shape.
    DecodeFailed(EventKey),
}

impl IngestOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }

    /// Returns the dispatch report, if the event reached the handlers.
    pub fn report(&self) -> Option<&DispatchReport> {
        match self {
            Self::Dispatched { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// The central pipeline from raw messages to handlers.
///
/// Cheap to clone: all state lives behind `Arc`s, so worker tasks can each
/// hold a copy.
#[derive(Clone)]
pub struct Dispatcher {
    schemas: Arc<SchemaRegistry>,
    extractor: Arc<dyn KeyExtractor>,
    handlers: Arc<HandlerRegistry>,
    sink: BoxedSink,
}

impl Dispatcher {
    /// Starts building a dispatcher over a frozen schema registry.
    pub fn builder(schemas: SchemaRegistry) -> DispatcherBuilder {
        DispatcherBuilder {
            schemas,
            extractor: Arc::new(FieldKeyExtractor::default()),
            sink: Arc::new(TracingSink),
            handler_timeout: None,
        }
    }

    /// Creates a dispatcher with the default extractor and sink.
    pub fn new(schemas: SchemaRegistry) -> Self {
        Self::builder(schemas).build()
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    /// Returns the handler registry to subscribe on.
    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn sink(&self) -> &BoxedSink {
        &self.sink
    }

    /// Parses `text` as JSON and ingests it.
    pub async fn ingest_str(&self, text: &str) -> IngestOutcome {
        match RawMessage::parse(text) {
            Ok(raw) => self.ingest(&raw).await,
            Err(e) => self.malformed(e.into()),
        }
    }

    /// Ingests a JSON value.
    pub async fn ingest_value(&self, value: Value) -> IngestOutcome {
        match RawMessage::from_value(value) {
            Ok(raw) => self.ingest(&raw).await,
            Err(e) => self.malformed(e.into()),
        }
    }

    /// Runs one raw message through the pipeline.
    pub async fn ingest(&self, raw: &RawMessage) -> IngestOutcome {
        let key = match self.extractor.extract(raw) {
            Ok(key) => key,
            Err(e) => return self.malformed(e.into()),
        };

        let span = span!(Level::DEBUG, "ingest", key = %key);
        self.ingest_keyed(raw, key).instrument(span).await
    }

    async fn ingest_keyed(&self, raw: &RawMessage, key: EventKey) -> IngestOutcome {
        let Some(descriptor) = self.schemas.resolve(&key) else {
            self.sink.report(DispatchError::UnknownShape(key.clone()));
            return IngestOutcome::Unresolved(key);
        };
        trace!(name = descriptor.name(), "Resolved event shape");

        let event = match decoder::decode_keyed(raw, key.clone(), &descriptor) {
            Ok(event) => event,
            Err(source) => {
                self.sink.report(DispatchError::Decode {
                    key: key.clone(),
                    source,
                });
                return IngestOutcome::DecodeFailed(key);
            }
        };

        let report = self.handlers.dispatch(Arc::new(event)).await;
        if report.is_unhandled() {
            debug!("No handler subscribed");
        }
        IngestOutcome::Dispatched { key, report }
    }

    /// Delivers an already decoded event, skipping extraction and decoding.
    pub async fn dispatch(&self, event: Arc<TypedEvent>) -> DispatchReport {
        self.handlers.dispatch(event).await
    }

    fn malformed(&self, error: DispatchError) -> IngestOutcome {
        self.sink.report(error);
        IngestOutcome::Malformed
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("shapes", &self.schemas.len())
            .field("handlers", &self.handlers)
            .finish()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    schemas: SchemaRegistry,
    extractor: Arc<dyn KeyExtractor>,
    sink: BoxedSink,
    handler_timeout: Option<Duration>,
}

impl DispatcherBuilder {
    /// Sets the envelope key extractor.
    pub fn extractor(mut self, extractor: impl KeyExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Sets the sink for every per-message failure.
    pub fn sink(mut self, sink: impl ErrorSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Sets the default handler timeout.
    pub fn handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn build(self) -> Dispatcher {
        let handlers = HandlerRegistry::new()
            .with_boxed_sink(Arc::clone(&self.sink))
            .with_default_timeout(self.handler_timeout);
        debug!(shapes = self.schemas.len(), "Dispatcher ready");
        Dispatcher {
            schemas: Arc::new(self.schemas),
            extractor: self.extractor,
            handlers: Arc::new(handlers),
            sink: self.sink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::foundation::event::EventContext;
    use crate::foundation::key::Topic;
    use crate::foundation::schema::{FieldType, Schema};
    use crate::foundation::value::Id;
    use crate::framework::descriptor::EventDescriptor;
    use crate::framework::handler::sync_handler;
    use crate::integration::sink::CollectingSink;
    use parking_lot::Mutex;
    use serde_json::json;

    fn channel_info() -> Schema {
        Schema::builder()
            .optional("channel_id", FieldType::Id)
            .optional("channel_name", FieldType::String)
            .build()
    }

    fn registry() -> SchemaRegistry {
        let schema = Schema::builder()
            .required("guild_id", FieldType::Id)
            .required("channel_id", FieldType::Id)
            .required("operator_id", FieldType::Id)
            .optional("old_info", FieldType::record(channel_info()))
            .optional("new_info", FieldType::record(channel_info()))
            .build();
        let mut builder = SchemaRegistry::builder();
        builder
            .register(EventDescriptor::new(
                EventKey::notice("guild", "channel_updated"),
                "channel_updated",
                schema,
            ))
            .unwrap();
        builder.build()
    }

    fn dispatcher(sink: &Arc<CollectingSink>) -> Dispatcher {
        Dispatcher::builder(registry())
            .sink(Arc::clone(sink))
            .build()
    }

    fn channel_updated() -> Value {
        json!({
            "post_type": "notice",
            "sub_type": "guild",
            "detail_type": "channel_updated",
            "guild_id": "G1",
            "channel_id": "C9",
            "operator_id": "U7",
            "old_info": {"channel_name": "general"},
            "new_info": {"channel_name": "announcements"}
        })
    }

    #[tokio::test]
    async fn test_channel_updated_reaches_handler() {
        let sink = Arc::new(CollectingSink::new());
        let dispatcher = dispatcher(&sink);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        dispatcher.handlers().subscribe(
            EventKey::notice("guild", "channel_updated"),
            move |ctx: Arc<EventContext>| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    seen.lock().push(ctx.event().clone());
                    Ok::<_, anyhow::Error>(())
                }
            },
        );

        let outcome = dispatcher.ingest_value(channel_updated()).await;
        assert!(outcome.is_dispatched());
        assert_eq!(outcome.report().map(|r| r.invoked), Some(1));
        assert!(sink.is_empty());

        let seen = seen.lock();
        let event = &seen[0];
        assert_eq!(event.id("guild_id"), Some(&Id::from("G1")));
        assert_eq!(event.id("channel_id"), Some(&Id::from("C9")));
        assert_eq!(event.id("operator_id"), Some(&Id::from("U7")));
        assert_eq!(
            event.record("old_info").and_then(|r| r.str("channel_name")),
            Some("general")
        );
        assert_eq!(
            event.record("new_info").and_then(|r| r.str("channel_name")),
            Some("announcements")
        );
    }

    #[tokio::test]
    async fn test_missing_operator_is_decode_error() {
        let sink = Arc::new(CollectingSink::new());
        let dispatcher = dispatcher(&sink);
        let log = Arc::new(Mutex::new(0));
        let log_clone = Arc::clone(&log);
        dispatcher.handlers().subscribe(
            Topic::Any,
            sync_handler(move |_| {
                *log_clone.lock() += 1;
                Ok(())
            }),
        );

        let mut message = channel_updated();
        message.as_object_mut().unwrap().remove("operator_id");

        let key = EventKey::notice("guild", "channel_updated");
        assert_eq!(
            dispatcher.ingest_value(message).await,
            IngestOutcome::DecodeFailed(key.clone())
        );
        assert_eq!(*log.lock(), 0);

        match sink.take().as_slice() {
            [DispatchError::Decode { key: k, source }] => {
                assert_eq!(k, &key);
                assert_eq!(source, &DecodeError::MissingField("operator_id".into()));
            }
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_and_malformed() {
        let sink = Arc::new(CollectingSink::new());
        let dispatcher = dispatcher(&sink);

        let outcome = dispatcher
            .ingest_value(json!({"post_type": "notice", "sub_type": "guild", "detail_type": "mystery"}))
            .await;
        assert_eq!(
            outcome,
            IngestOutcome::Unresolved(EventKey::notice("guild", "mystery"))
        );

        assert_eq!(dispatcher.ingest_str("[1, 2]").await, IngestOutcome::Malformed);
        assert_eq!(dispatcher.ingest_str("{oops").await, IngestOutcome::Malformed);
        assert_eq!(
            dispatcher.ingest_value(json!({"detail_type": "x"})).await,
            IngestOutcome::Malformed
        );

        assert_eq!(
            sink.kinds(),
            [
                "unknown_shape",
                "malformed_envelope",
                "malformed_envelope",
                "malformed_envelope"
            ]
        );
    }

    #[tokio::test]
    async fn test_numeric_and_string_ids_decode_equal() {
        let sink = Arc::new(CollectingSink::new());
        let dispatcher = dispatcher(&sink);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        dispatcher.handlers().subscribe(
            Topic::Any,
            sync_handler(move |ctx| {
                seen_clone.lock().push(ctx.event().clone());
                Ok(())
            }),
        );

        let mut numeric = channel_updated();
        numeric["guild_id"] = json!(144115218677563300_u64);
        let mut textual = channel_updated();
        textual["guild_id"] = json!("144115218677563300");

        dispatcher.ingest_value(numeric).await;
        dispatcher.ingest_value(textual).await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
    }

    #[tokio::test]
    async fn test_clones_share_handlers() {
        let sink = Arc::new(CollectingSink::new());
        let dispatcher = dispatcher(&sink);
        let clone = dispatcher.clone();
        clone
            .handlers()
            .subscribe(Topic::Any, sync_handler(|_| Ok(())));

        let outcome = dispatcher.ingest_value(channel_updated()).await;
        assert_eq!(outcome.report().map(|r| r.invoked), Some(1));
    }
}
