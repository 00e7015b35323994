//! Configuration for the Signet runtime.
//!
//! Layered loading with figment (defaults, files, `SIGNET_*` environment
//! variables) followed by validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DispatchConfig, DispatchMode, EnvelopeConfig, EnvelopeLayout, LogFormat, LogLevel, LogOutput,
    LogRotation, LoggingConfig, SignetConfig, SpanEventConfig,
};
pub use validation::validate_config;
