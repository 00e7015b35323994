//! Decoded value types.
//!
//! - [`ValueKind`] names the JSON kind of a raw value (for error messages)
//! - [`Id`] is the normalized identifier type
//! - [`FieldValue`] and [`Record`] hold decoded fields

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ============================================================================
// Value Kind
// ============================================================================

/// The dynamic kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Returns the kind of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Returns the lowercase name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Id
// ============================================================================

/// A protocol identifier (user, group, guild, channel, message, ...).
///
/// OneBot implementations send the same identifier as a JSON number or a JSON
/// string depending on the event and the implementation. `Id` stores the
/// decimal string form either way, so `123` and `"123"` compare equal and hash
/// the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Id(Arc<str>);

impl Id {
    /// Creates an id from its string form.
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    /// Returns the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the id as a signed integer.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// Whether this is the empty (zero) id.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Self(Arc::from(n.to_string()))
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Self(Arc::from(n.to_string()))
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Id {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Signed(i64),
            Unsigned(u64),
            Text(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Signed(n) => Id::from(n),
            Repr::Unsigned(n) => Id::from(n),
            Repr::Text(s) => Id::from(s),
        })
    }
}

// ============================================================================
// Field Value
// ============================================================================

/// One decoded field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Id(Id),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Opaque JSON, kept as received.
    Json(Value),
    List(Vec<FieldValue>),
    Record(Record),
}

impl FieldValue {
    /// Returns the JSON kind this value corresponds to.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Str(_) | Self::Id(_) => ValueKind::String,
            Self::Int(_) | Self::Float(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Bool,
            Self::Json(v) => ValueKind::of(v),
            Self::List(_) => ValueKind::Array,
            Self::Record(_) => ValueKind::Object,
        }
    }

    /// Returns the string content of a `Str` or `Id`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Id(id) => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<&Id> {
        match self {
            Self::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Converts the value back into JSON.
    pub fn to_json(&self) -> Value {
        // Serializing a FieldValue into a Value cannot fail: every variant maps
        // onto a JSON construct and map keys are strings.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Id(id) => id.serialize(serializer),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(n) => serializer.serialize_f64(*n),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Json(v) => v.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Record(record) => record.serialize(serializer),
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// An ordered set of decoded fields, keyed by semantic name.
///
/// Field order follows the schema that produced the record. Equality is
/// structural.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(Arc<str>, FieldValue)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Appends a field, replacing an existing field with the same name.
    pub fn insert(&mut self, name: impl Into<Arc<str>>, value: FieldValue) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<Arc<str>>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value of a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (&**n, v))
    }

    pub fn id(&self, name: &str) -> Option<&Id> {
        self.get(name).and_then(FieldValue::as_id)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        self.get(name).and_then(FieldValue::as_record)
    }

    pub fn list(&self, name: &str) -> Option<&[FieldValue]> {
        self.get(name).and_then(FieldValue::as_list)
    }

    pub fn json(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(FieldValue::as_json)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(&**name, value)?;
        }
        map.end()
    }
}
