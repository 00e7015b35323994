//! Schema-driven decoding.
//!
//! [`decode`] turns a [`RawMessage`] into a [`TypedEvent`] using the decode
//! function of an [`EventDescriptor`]. The generic function,
//! [`decode_fields`], walks the schema in order:
//!
//! - a `null` counts as absent
//! - absent and required is [`DecodeError::MissingField`]
//! - absent and optional is the zero value of the field type
//! - present values are converted, or fail with [`DecodeError::TypeMismatch`]
//!
//! Keys not named by the schema are ignored. The raw message is never
//! modified and the result owns its data.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::foundation::event::TypedEvent;
use crate::foundation::key::EventKey;
use crate::foundation::raw::RawMessage;
use crate::foundation::schema::{FieldType, Schema};
use crate::foundation::value::{FieldValue, Id, Record, ValueKind};
use crate::framework::descriptor::EventDescriptor;

/// Decodes `raw` with `descriptor`, keyed by the descriptor's own key.
pub fn decode(
    raw: &RawMessage,
    descriptor: &Arc<EventDescriptor>,
) -> Result<TypedEvent, DecodeError> {
    decode_keyed(raw, descriptor.key().clone(), descriptor)
}

/// Decodes `raw` with `descriptor`, keeping the key read from the envelope.
pub fn decode_keyed(
    raw: &RawMessage,
    key: EventKey,
    descriptor: &Arc<EventDescriptor>,
) -> Result<TypedEvent, DecodeError> {
    let fields = descriptor.decode_fields(raw)?;
    Ok(TypedEvent::new(key, Arc::clone(descriptor), fields))
}

/// The generic [`DecodeFn`](crate::framework::descriptor::DecodeFn).
pub fn decode_fields(raw: &RawMessage, schema: &Schema) -> Result<Record, DecodeError> {
    decode_record(raw.as_map(), schema, "")
}

/// Decodes one JSON object against `schema`.
///
/// `path` prefixes field names in errors; pass `""` at the top level.
pub fn decode_record(
    object: &Map<String, Value>,
    schema: &Schema,
    path: &str,
) -> Result<Record, DecodeError> {
    let mut record = Record::with_capacity(schema.len());

    for field in schema.fields() {
        let field_path = join(path, field.wire_name());
        let value = match object.get(field.wire_name()) {
            None | Some(Value::Null) if field.is_required() => {
                return Err(DecodeError::MissingField(field_path));
            }
            None | Some(Value::Null) => field.ty().zero_value(),
            Some(value) => convert(value, field.ty(), &field_path)?,
        };
        record.insert(field.name_arc(), value);
    }

    Ok(record)
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn mismatch(path: &str, ty: &FieldType, value: &Value) -> DecodeError {
    DecodeError::TypeMismatch {
        field: path.to_string(),
        expected: ty.name(),
        actual: ValueKind::of(value),
    }
}

fn convert(value: &Value, ty: &FieldType, path: &str) -> Result<FieldValue, DecodeError> {
    let converted = match (ty, value) {
        (FieldType::String, Value::String(s)) => FieldValue::Str(s.clone()),
        (FieldType::Id, Value::String(s)) => FieldValue::Id(Id::from(s.as_str())),
        (FieldType::Id, Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Id(Id::from(i))
            } else if let Some(u) = n.as_u64() {
                FieldValue::Id(Id::from(u))
            } else {
                return Err(mismatch(path, ty, value));
            }
        }
        (FieldType::Int, Value::Number(n)) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => return Err(mismatch(path, ty, value)),
        },
        (FieldType::Float, Value::Number(n)) => match n.as_f64() {
            Some(f) => FieldValue::Float(f),
            None => return Err(mismatch(path, ty, value)),
        },
        (FieldType::Bool, Value::Bool(b)) => FieldValue::Bool(*b),
        (FieldType::Json, v) => FieldValue::Json(v.clone()),
        (FieldType::List(inner), Value::Array(items)) => FieldValue::List(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| convert(item, inner, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        (FieldType::Record(schema), Value::Object(object)) => {
            FieldValue::Record(decode_record(object, schema, path)?)
        }
        _ => return Err(mismatch(path, ty, value)),
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slow_mode() -> Schema {
        Schema::builder()
            .optional("slow_mode_key", FieldType::Int)
            .optional("slow_mode_text", FieldType::String)
            .build()
    }

    fn info() -> Schema {
        Schema::builder()
            .optional("channel_name", FieldType::String)
            .optional("slow_modes", FieldType::list(FieldType::record(slow_mode())))
            .build()
    }

    fn descriptor() -> Arc<EventDescriptor> {
        let schema = Schema::builder()
            .required("guild_id", FieldType::Id)
            .required_as("operator_id", "operator", FieldType::Id)
            .optional("time", FieldType::Int)
            .optional("old_info", FieldType::record(info()))
            .build();
        Arc::new(EventDescriptor::new(
            EventKey::notice("guild", "channel_updated"),
            "channel_updated",
            schema,
        ))
    }

    fn raw(value: Value) -> RawMessage {
        RawMessage::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_well_formed() {
        let raw = raw(json!({
            "guild_id": 9,
            "operator_id": "42",
            "time": 1700000000,
            "unknown": [1, 2, 3],
            "old_info": {
                "channel_name": "general",
                "slow_modes": [{"slow_mode_key": 0, "slow_mode_text": "off"}]
            }
        }));

        let event = decode(&raw, &descriptor()).unwrap();
        assert_eq!(event.key(), &EventKey::notice("guild", "channel_updated"));
        assert_eq!(event.id("guild_id"), Some(&Id::from("9")));
        assert_eq!(event.id("operator"), Some(&Id::from(42_i64)));
        assert_eq!(event.int("time"), Some(1700000000));
        assert!(event.get("unknown").is_none());

        let old = event.record("old_info").unwrap();
        assert_eq!(old.str("channel_name"), Some("general"));
        let modes = old.list("slow_modes").unwrap();
        assert_eq!(modes[0].as_record().unwrap().str("slow_mode_text"), Some("off"));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let raw = raw(json!({"guild_id": "1", "operator_id": 2}));
        let descriptor = descriptor();
        assert_eq!(
            decode(&raw, &descriptor).unwrap(),
            decode(&raw, &descriptor).unwrap()
        );
    }

    #[test]
    fn test_missing_and_null_required() {
        let err = decode(&raw(json!({"guild_id": "1"})), &descriptor()).unwrap_err();
        assert_eq!(err, DecodeError::MissingField("operator_id".into()));

        let err = decode(
            &raw(json!({"guild_id": null, "operator_id": 1})),
            &descriptor(),
        )
        .unwrap_err();
        assert_eq!(err, DecodeError::MissingField("guild_id".into()));
    }

    #[test]
    fn test_optional_defaults() {
        let event = decode(&raw(json!({"guild_id": 1, "operator_id": 2})), &descriptor()).unwrap();
        assert_eq!(event.int("time"), Some(0));
        let old = event.record("old_info").unwrap();
        assert_eq!(old.str("channel_name"), Some(""));
        assert_eq!(old.list("slow_modes"), Some(&[][..]));
    }

    #[test]
    fn test_type_mismatch_paths() {
        let err = decode(
            &raw(json!({"guild_id": 1, "operator_id": 2, "time": "soon"})),
            &descriptor(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                field: "time".into(),
                expected: "int",
                actual: ValueKind::String,
            }
        );

        let err = decode(
            &raw(json!({
                "guild_id": 1,
                "operator_id": 2,
                "old_info": {"slow_modes": [{}, {"slow_mode_key": true}]}
            })),
            &descriptor(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("old_info.slow_modes[1].slow_mode_key"));
    }

    #[test]
    fn test_id_rejects_floats() {
        let err = decode(&raw(json!({"guild_id": 1.5, "operator_id": 2})), &descriptor())
            .unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { expected: "id", .. }));
    }

    #[test]
    fn test_float_accepts_integers() {
        let schema = Schema::builder().required("ratio", FieldType::Float).build();
        let record = decode_fields(&raw(json!({"ratio": 3})), &schema).unwrap();
        assert_eq!(record.float("ratio"), Some(3.0));
    }
}
