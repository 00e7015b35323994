//! Event shape descriptors.

use std::fmt;

use crate::error::DecodeError;
use crate::foundation::key::EventKey;
use crate::foundation::raw::RawMessage;
use crate::foundation::schema::Schema;
use crate::foundation::value::Record;
use crate::framework::decoder;

/// Decodes the fields of a raw message according to a schema.
///
/// The default is [`decoder::decode_fields`]. Shapes whose wire format cannot
/// be expressed as a flat schema supply their own function.
pub type DecodeFn = fn(&RawMessage, &Schema) -> Result<Record, DecodeError>;

/// Everything the core knows about one event shape.
///
/// Built once at startup and shared as `Arc<EventDescriptor>` through the
/// [`SchemaRegistry`](crate::framework::registry::SchemaRegistry).
#[derive(Clone)]
pub struct EventDescriptor {
    key: EventKey,
    name: String,
    schema: Schema,
    decode: DecodeFn,
    cancellable: bool,
}

impl EventDescriptor {
    /// Creates a descriptor using the generic decoder.
    pub fn new(key: EventKey, name: impl Into<String>, schema: Schema) -> Self {
        Self {
            key,
            name: name.into(),
            schema,
            decode: decoder::decode_fields,
            cancellable: false,
        }
    }

    /// Replaces the decode function.
    pub fn with_decoder(mut self, decode: DecodeFn) -> Self {
        self.decode = decode;
        self
    }

    /// Sets whether handlers may stop propagation for this shape.
    pub fn cancellable(mut self, cancellable: bool) -> Self {
        self.cancellable = cancellable;
        self
    }

    pub fn key(&self) -> &EventKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    /// Runs the decode function on `raw`.
    pub fn decode_fields(&self, raw: &RawMessage) -> Result<Record, DecodeError> {
        (self.decode)(raw, &self.schema)
    }
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("fields", &self.schema.len())
            .field("cancellable", &self.cancellable)
            .finish()
    }
}
