//! # Signet Core
//!
//! The event decoding and dispatch core of the Signet OneBot SDK.
//!
//! OneBot implementations push JSON events tagged by a post type, a sub-type
//! and a detail type. This crate turns each raw message into a typed event and
//! routes it to the handlers subscribed for it. Concrete event shapes are
//! data: entries in a schema table, not code in the core.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! The data model:
//! - **Keys**: [`EventKey`] selects a shape, [`Topic`] is what handlers subscribe to
//! - **Schemas**: [`Schema`], [`Field`] and [`FieldType`] describe a shape's fields
//! - **Values**: [`RawMessage`] in, [`Record`] of [`FieldValue`]s out, [`Id`] for identifiers
//! - **Events**: [`TypedEvent`] and the handler-facing [`EventContext`]
//! - **Views**: [`FromRecord`] for plain structs over decoded records
//!
//! ### Framework Layer
//!
//! Decoding and routing:
//! - **Schema Registry**: [`SchemaRegistryBuilder`] and the frozen [`SchemaRegistry`]
//! - **Decoder**: [`decode`] driven by an [`EventDescriptor`]
//! - **Handler Registry**: [`HandlerRegistry`] with ordered, isolated invocation
//! - **Dispatcher**: [`Dispatcher`], the pipeline from raw message to handlers
//!
//! ### Integration Layer
//!
//! Seams to external collaborators:
//! - **Envelope**: [`KeyExtractor`] reads the event key out of a raw message
//! - **Error Sinks**: [`ErrorSink`] receives every per-message failure
//!
//! ## Data Flow
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌────────────────┐   ┌─────────┐   ┌──────────┐
//! │ Transport │──▶│ KeyExtractor │──▶│ SchemaRegistry │──▶│ Decoder │──▶│ Handlers │
//! └───────────┘   └──────────────┘   └────────────────┘   └─────────┘   └──────────┘
//!                        │                   │                 │              │
//!                        └───────────────────┴─────────────────┴──────────────┴──▶ ErrorSink
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use signet_core::prelude::*;
//!
//! let mut builder = SchemaRegistry::builder();
//! builder.register(EventDescriptor::new(
//!     EventKey::notice("guild", "channel_updated"),
//!     "channel_updated",
//!     Schema::builder()
//!         .required("guild_id", FieldType::Id)
//!         .required("channel_id", FieldType::Id)
//!         .required("operator_id", FieldType::Id)
//!         .build(),
//! ))?;
//!
//! let dispatcher = Dispatcher::new(builder.build());
//! dispatcher.handlers().subscribe(
//!     EventKey::notice("guild", "channel_updated"),
//!     |ctx: Arc<EventContext>| async move {
//!         println!("channel {} updated", ctx.id("channel_id").unwrap());
//!         Ok(())
//!     },
//! );
//!
//! dispatcher.ingest_str(r#"{"post_type":"notice", ...}"#).await;
//! ```

pub mod error;

// Architectural layers
pub mod foundation;
pub mod framework;
pub mod integration;

// Used by `#[shape_provider]`.
pub use linkme;

// Re-export error types
pub use error::{
    DecodeError, DecodeResult, DispatchError, DuplicateKeyError, EnvelopeError, HandlerError,
    NotFoundError, Severity,
};

// Re-export foundation types
pub use foundation::{
    EventContext, EventKey, Field, FieldType, FieldValue, FromFieldValue, FromRecord, Id,
    ParseKeyError, PostType, RawMessage, Record, Schema, SchemaBuilder, Topic, TypedEvent,
    ValueKind, nested_record,
};

// Re-export framework types
pub use framework::{
    BoxFuture, BoxedHandler, DecodeFn, DispatchReport, Dispatcher, DispatcherBuilder,
    EventDescriptor, Handler, HandlerRegistry, HandlerResult, IngestOutcome, InvocationMode,
    SHAPE_PROVIDERS, SchemaRegistry, SchemaRegistryBuilder, ShapeProvider, SubscribeOptions,
    SubscriptionId, decode, decode_fields, decode_keyed, decode_record, into_handler,
    sync_handler,
};

// Re-export integration types
pub use integration::{
    BoxedSink, ChannelSink, CollectingSink, ErrorSink, FieldKeyExtractor, KeyExtractor,
    SinkStats, StatsSink, TracingSink,
};

/// Prelude for common imports.
pub mod prelude {
    pub use std::sync::Arc;

    pub use super::foundation::*;
    pub use super::framework::{
        Dispatcher, EventDescriptor, Handler, HandlerRegistry, HandlerResult, SchemaRegistry,
        SubscribeOptions, SubscriptionId, sync_handler,
    };
    pub use super::integration::{ErrorSink, KeyExtractor};
    pub use super::{DecodeError, DispatchError};
}
