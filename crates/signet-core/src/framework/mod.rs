//! Framework layer - decoding and routing.
//!
//! - Shape descriptors and the frozen schema registry
//! - The schema-driven decoder
//! - Handlers, subscriptions and the dispatcher

pub mod decoder;
pub mod descriptor;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod subscription;

pub use decoder::{decode, decode_fields, decode_keyed, decode_record};
pub use descriptor::{DecodeFn, EventDescriptor};
pub use dispatcher::{Dispatcher, DispatcherBuilder, IngestOutcome};
pub use futures::future::BoxFuture;
pub use handler::{BoxedHandler, Handler, HandlerResult, into_handler, sync_handler};
pub use registry::{SHAPE_PROVIDERS, SchemaRegistry, SchemaRegistryBuilder, ShapeProvider};
pub use subscription::{
    DispatchReport, HandlerRegistry, InvocationMode, SubscribeOptions, SubscriptionId,
};
