//! Envelope key extraction.
//!
//! A [`KeyExtractor`] reads the discriminator fields of a [`RawMessage`] and
//! builds its [`EventKey`]. [`FieldKeyExtractor`] reads three named string
//! fields, `post_type`, `sub_type` and `detail_type` by default. Protocol
//! crates provide their own extractor for other envelope layouts.

use std::sync::Arc;

use serde_json::Value;

use crate::error::EnvelopeError;
use crate::foundation::key::EventKey;
use crate::foundation::raw::RawMessage;
use crate::foundation::value::ValueKind;

/// Builds the event key of a raw message.
pub trait KeyExtractor: Send + Sync + 'static {
    fn extract(&self, raw: &RawMessage) -> Result<EventKey, EnvelopeError>;
}

impl<K: KeyExtractor + ?Sized> KeyExtractor for Arc<K> {
    fn extract(&self, raw: &RawMessage) -> Result<EventKey, EnvelopeError> {
        (**self).extract(raw)
    }
}

/// Reads an optional string discriminator.
///
/// Absent or `null` yields `None`; any other non-string is
/// [`EnvelopeError::InvalidDiscriminator`].
pub fn discriminator<'a>(raw: &'a RawMessage, field: &str) -> Result<Option<&'a str>, EnvelopeError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(EnvelopeError::InvalidDiscriminator {
            field: field.to_string(),
            actual: ValueKind::of(other),
        }),
    }
}

/// Reads the post type discriminator, which must be a non-empty string.
pub fn post_type<'a>(raw: &'a RawMessage, field: &str) -> Result<&'a str, EnvelopeError> {
    match discriminator(raw, field)? {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(EnvelopeError::MissingPostType {
            field: field.to_string(),
        }),
    }
}

/// Extracts the key from three configurable string fields.
///
/// The post type must be a non-empty string. Sub-type and detail type
/// default to `""` when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKeyExtractor {
    post_type_field: String,
    sub_type_field: String,
    detail_type_field: String,
}

impl Default for FieldKeyExtractor {
    fn default() -> Self {
        Self::new("post_type", "sub_type", "detail_type")
    }
}

impl FieldKeyExtractor {
    pub fn new(
        post_type_field: impl Into<String>,
        sub_type_field: impl Into<String>,
        detail_type_field: impl Into<String>,
    ) -> Self {
        Self {
            post_type_field: post_type_field.into(),
            sub_type_field: sub_type_field.into(),
            detail_type_field: detail_type_field.into(),
        }
    }

    pub fn post_type_field(&self) -> &str {
        &self.post_type_field
    }

    pub fn sub_type_field(&self) -> &str {
        &self.sub_type_field
    }

    pub fn detail_type_field(&self) -> &str {
        &self.detail_type_field
    }
}

impl KeyExtractor for FieldKeyExtractor {
    fn extract(&self, raw: &RawMessage) -> Result<EventKey, EnvelopeError> {
        let post = post_type(raw, &self.post_type_field)?;
        let sub = discriminator(raw, &self.sub_type_field)?.unwrap_or("");
        let detail = discriminator(raw, &self.detail_type_field)?.unwrap_or("");
        Ok(EventKey::new(post, sub, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawMessage {
        RawMessage::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_explicit_layout() {
        let key = FieldKeyExtractor::default()
            .extract(&raw(json!({
                "post_type": "notice",
                "sub_type": "guild",
                "detail_type": "channel_updated",
            })))
            .unwrap();
        assert_eq!(key, EventKey::notice("guild", "channel_updated"));
    }

    #[test]
    fn test_missing_sub_and_detail_default_to_empty() {
        let key = FieldKeyExtractor::default()
            .extract(&raw(json!({"post_type": "meta_event"})))
            .unwrap();
        assert_eq!(key, EventKey::meta("", ""));
    }

    #[test]
    fn test_invalid_envelopes() {
        let extractor = FieldKeyExtractor::default();
        assert_eq!(
            extractor.extract(&raw(json!({"sub_type": "guild"}))),
            Err(EnvelopeError::MissingPostType {
                field: "post_type".into()
            })
        );
        assert_eq!(
            extractor.extract(&raw(json!({"post_type": ""}))),
            Err(EnvelopeError::MissingPostType {
                field: "post_type".into()
            })
        );
        assert_eq!(
            extractor.extract(&raw(json!({"post_type": "notice", "detail_type": 3}))),
            Err(EnvelopeError::InvalidDiscriminator {
                field: "detail_type".into(),
                actual: ValueKind::Number,
            })
        );
    }

    #[test]
    fn test_custom_field_names() {
        let extractor = FieldKeyExtractor::new("type", "sub", "detail");
        let key = extractor
            .extract(&raw(json!({"type": "request", "detail": "friend"})))
            .unwrap();
        assert_eq!(key, EventKey::request("", "friend"));
    }
}
