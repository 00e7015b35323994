//! The untyped inbound payload.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::EnvelopeError;
use crate::foundation::value::ValueKind;

/// A parsed wire payload before its shape is known.
///
/// Wraps an insertion-ordered JSON object. The transport owns raw messages;
/// the core only borrows them while extracting the key and decoding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawMessage(Map<String, Value>);

impl RawMessage {
    /// Wraps an existing JSON object.
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parses a JSON document. Anything but an object is rejected.
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Converts a JSON value. Anything but an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(EnvelopeError::NotAnObject(ValueKind::of(&other))),
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for RawMessage {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Value> for RawMessage {
    type Error = EnvelopeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Map<String, Value>> for RawMessage {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
