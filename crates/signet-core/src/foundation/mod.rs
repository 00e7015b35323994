//! Foundation layer - data model.
//!
//! - Event keys and subscription topics
//! - Raw inbound payloads
//! - Field schemas and decoded values
//! - Typed events, handler context and typed views

pub mod event;
pub mod key;
pub mod raw;
pub mod schema;
pub mod value;
pub mod view;

pub use event::{EventContext, TypedEvent};
pub use key::{EventKey, ParseKeyError, PostType, Topic};
pub use raw::RawMessage;
pub use schema::{Field, FieldType, Schema, SchemaBuilder};
pub use value::{FieldValue, Id, Record, ValueKind};
pub use view::{FromFieldValue, FromRecord, nested_record};
