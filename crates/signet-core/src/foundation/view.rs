//! Typed views over decoded records.
//!
//! Handlers that prefer plain structs over [`Record`] lookups implement
//! [`FromRecord`], usually through `#[derive(FromRecord)]` from
//! `signet-macros`:
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, FromRecord)]
//! pub struct ChannelUpdatedNotice {
//!     pub guild_id: Id,
//!     pub channel_id: Id,
//!     pub operator_id: Id,
//!     pub old_info: ChannelInfo,
//!     pub new_info: ChannelInfo,
//! }
//!
//! let notice: ChannelUpdatedNotice = event.view()?;
//! ```

use serde_json::Value;

use crate::error::DecodeError;
use crate::foundation::value::{FieldValue, Id, Record, ValueKind};

/// Builds a typed value from a whole record.
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> Result<Self, DecodeError>;
}

/// Builds a typed value from one field.
///
/// `field` is the path used in error messages.
pub trait FromFieldValue: Sized {
    fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError>;

    /// Called when the record has no such field.
    fn from_absent(field: &str) -> Result<Self, DecodeError> {
        Err(DecodeError::MissingField(field.to_string()))
    }
}

impl Record {
    /// Reads one field as `T`.
    pub fn extract<T: FromFieldValue>(&self, name: &str) -> Result<T, DecodeError> {
        match self.get(name) {
            Some(value) => T::from_field_value(value, name),
            None => T::from_absent(name),
        }
    }
}

fn mismatch(field: &str, expected: &'static str, value: &FieldValue) -> DecodeError {
    DecodeError::TypeMismatch {
        field: field.to_string(),
        expected,
        actual: value.kind(),
    }
}

impl FromFieldValue for Id {
    fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError> {
        match value {
            FieldValue::Id(id) => Ok(id.clone()),
            FieldValue::Str(s) => Ok(Id::from(s.as_str())),
            FieldValue::Int(n) => Ok(Id::from(*n)),
            other => Err(mismatch(field, "id", other)),
        }
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(field, "string", value))
    }
}

impl FromFieldValue for i64 {
    fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError> {
        value.as_i64().ok_or_else(|| mismatch(field, "int", value))
    }
}

macro_rules! impl_narrow_int {
    ($($ty:ty),*) => {
        $(
            impl FromFieldValue for $ty {
                fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError> {
                    value
                        .as_i64()
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .ok_or_else(|| mismatch(field, stringify!($ty), value))
                }
            }
        )*
    };
}

impl_narrow_int!(i32, u32, u64);

impl FromFieldValue for f64 {
    fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError> {
        value.as_f64().ok_or_else(|| mismatch(field, "float", value))
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError> {
        value.as_bool().ok_or_else(|| mismatch(field, "bool", value))
    }
}

impl FromFieldValue for Value {
    fn from_field_value(value: &FieldValue, _field: &str) -> Result<Self, DecodeError> {
        Ok(value.to_json())
    }

    fn from_absent(_field: &str) -> Result<Self, DecodeError> {
        Ok(Value::Null)
    }
}

impl FromFieldValue for Record {
    fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError> {
        value
            .as_record()
            .cloned()
            .ok_or_else(|| mismatch(field, "record", value))
    }
}

impl<T: FromFieldValue> FromFieldValue for Vec<T> {
    fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError> {
        let items = value
            .as_list()
            .ok_or_else(|| mismatch(field, "list", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_field_value(item, &format!("{field}[{i}]")))
            .collect()
    }
}

impl<T: FromFieldValue> FromFieldValue for Option<T> {
    fn from_field_value(value: &FieldValue, field: &str) -> Result<Self, DecodeError> {
        match value {
            FieldValue::Json(Value::Null) => Ok(None),
            other => T::from_field_value(other, field).map(Some),
        }
    }

    fn from_absent(_field: &str) -> Result<Self, DecodeError> {
        Ok(None)
    }
}

/// Converts a nested record field through `T::from_record`, re-rooting error
/// paths under `field`. Used by derived [`FromFieldValue`] impls.
pub fn nested_record<T: FromRecord>(value: &FieldValue, field: &str) -> Result<T, DecodeError> {
    match value {
        FieldValue::Record(record) => T::from_record(record).map_err(|e| e.at(field)),
        other => Err(DecodeError::TypeMismatch {
            field: field.to_string(),
            expected: "record",
            actual: match other {
                FieldValue::Json(v) => ValueKind::of(v),
                _ => other.kind(),
            },
        }),
    }
}
