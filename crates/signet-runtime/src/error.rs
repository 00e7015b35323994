//! Runtime error types.

use signet_core::DuplicateKeyError;
use thiserror::Error;

use crate::config::{ConfigError, EnvelopeLayout};

/// Errors that can occur while building or running a runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two shape providers registered the same key.
    #[error("Failed to build schema registry: {0}")]
    Registry(#[from] DuplicateKeyError),

    /// The configured layout has no built-in extractor.
    #[error("Envelope layout {0:?} needs an extractor, set one on the runtime builder")]
    MissingExtractor(EnvelopeLayout),

    /// The runtime has shut down and no longer accepts messages.
    #[error("Inbound channel is closed")]
    InboundClosed,

    /// `run` was called on a runtime that already ran.
    #[error("Runtime is already running or has finished")]
    AlreadyRunning,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
