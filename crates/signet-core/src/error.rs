//! Unified error types for the Signet core.
//!
//! Registration errors ([`DuplicateKeyError`]) are returned to the caller and
//! are fatal to startup. Everything that can go wrong with a single inbound
//! message ends up as a [`DispatchError`] delivered to an
//! [`ErrorSink`](crate::integration::sink::ErrorSink).

use std::time::Duration;

use thiserror::Error;

use crate::foundation::key::EventKey;
use crate::foundation::value::ValueKind;
use crate::framework::subscription::SubscriptionId;

// =============================================================================
// Registration Errors
// =============================================================================

/// An event shape was registered twice under the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event shape '{key}' is already registered")]
pub struct DuplicateKeyError {
    /// The key that was already present.
    pub key: EventKey,
}

/// A subscription id was not known to the handler registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("subscription {id} not found")]
pub struct NotFoundError {
    /// The missing subscription.
    pub id: SubscriptionId,
}

// =============================================================================
// Envelope Errors
// =============================================================================

/// The message envelope could not be read far enough to build an [`EventKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The payload was not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The payload was valid JSON but not an object.
    #[error("message is not a JSON object (got {0})")]
    NotAnObject(ValueKind),

    /// The post type discriminator is absent or empty.
    #[error("missing or empty '{field}' discriminator")]
    MissingPostType {
        /// Name of the discriminator field.
        field: String,
    },

    /// A discriminator field is present but not a string.
    #[error("discriminator '{field}' must be a string, got {actual}")]
    InvalidDiscriminator {
        /// Name of the discriminator field.
        field: String,
        /// JSON kind that was found instead.
        actual: ValueKind,
    },
}

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors produced while converting a raw message into a typed event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A required field was absent (or `null`).
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// A field was present with the wrong JSON kind.
    #[error("field '{field}' expected {expected}, got {actual}")]
    TypeMismatch {
        /// Dotted path of the field.
        field: String,
        /// Name of the semantic type that was expected.
        expected: &'static str,
        /// JSON kind that was found.
        actual: ValueKind,
    },

    /// Error raised by a custom decode function.
    #[error("{0}")]
    Custom(String),
}

impl DecodeError {
    /// Creates a custom decode error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Returns the field path this error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField(field) | Self::TypeMismatch { field, .. } => Some(field),
            Self::Custom(_) => None,
        }
    }

    /// Re-roots the field path under `parent`.
    ///
    /// `channel_name` becomes `old_info.channel_name`.
    pub fn at(self, parent: &str) -> Self {
        if parent.is_empty() {
            return self;
        }
        match self {
            Self::MissingField(field) => Self::MissingField(format!("{parent}.{field}")),
            Self::TypeMismatch {
                field,
                expected,
                actual,
            } => Self::TypeMismatch {
                field: format!("{parent}.{field}"),
                expected,
                actual,
            },
            other => other,
        }
    }
}

// =============================================================================
// Handler Errors
// =============================================================================

/// Failure of a single handler invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The handler did not finish within its timeout.
    #[error("handler timed out after {0:?}")]
    TimedOut(Duration),

    /// A detached or time-limited handler was dispatched outside a tokio
    /// runtime.
    #[error("no tokio runtime to run the handler on")]
    NoRuntime,
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// How loudly a [`DispatchError`] should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Expected in normal operation (protocol extensions, unregistered shapes).
    Info,
    /// A peer sent something we could not understand.
    Warn,
    /// User code failed.
    Error,
}

/// A per-message failure. Never fatal to the dispatch loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The envelope could not be read.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),

    /// No descriptor is registered for the key.
    #[error("unknown event shape '{0}'")]
    UnknownShape(EventKey),

    /// The payload did not match the registered schema.
    #[error("failed to decode '{key}': {source}")]
    Decode {
        /// Key of the message.
        key: EventKey,
        /// Underlying decode failure.
        #[source]
        source: DecodeError,
    },

    /// A handler failed while processing an event.
    #[error("handler {subscription} failed on '{key}': {source}")]
    Handler {
        /// Key of the event being handled.
        key: EventKey,
        /// The failing subscription.
        subscription: SubscriptionId,
        /// What went wrong.
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    /// Returns the reporting severity of this error.
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnknownShape(_) => Severity::Info,
            Self::MalformedEnvelope(_) | Self::Decode { .. } => Severity::Warn,
            Self::Handler { .. } => Severity::Error,
        }
    }

    /// Returns a short category name, suitable for metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope(_) => "malformed_envelope",
            Self::UnknownShape(_) => "unknown_shape",
            Self::Decode { .. } => "decode",
            Self::Handler { .. } => "handler",
        }
    }

    /// Returns the event key, when the envelope was readable.
    pub fn key(&self) -> Option<&EventKey> {
        match self {
            Self::MalformedEnvelope(_) => None,
            Self::UnknownShape(key) | Self::Decode { key, .. } | Self::Handler { key, .. } => {
                Some(key)
            }
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_rerooting() {
        let err = DecodeError::MissingField("channel_name".into()).at("old_info");
        assert_eq!(err.field(), Some("old_info.channel_name"));

        let err = DecodeError::custom("bad").at("old_info");
        assert_eq!(err, DecodeError::Custom("bad".into()));

        let err = DecodeError::MissingField("a".into()).at("");
        assert_eq!(err.field(), Some("a"));
    }

    #[test]
    fn test_dispatch_error_severity() {
        let key = EventKey::notice("guild", "channel_updated");
        assert_eq!(
            DispatchError::UnknownShape(key.clone()).severity(),
            Severity::Info
        );

        let err = DispatchError::Decode {
            key: key.clone(),
            source: DecodeError::MissingField("operator_id".into()),
        };
        assert_eq!(err.severity(), Severity::Warn);
        assert_eq!(err.kind(), "decode");
        assert_eq!(err.key(), Some(&key));
        assert_eq!(
            err.to_string(),
            "failed to decode 'notice/guild/channel_updated': missing required field 'operator_id'"
        );

        let err = DispatchError::from(EnvelopeError::NotAnObject(ValueKind::Array));
        assert_eq!(err.severity(), Severity::Warn);
        assert!(err.key().is_none());
    }
}
