//! Signet Runtime - configuration, logging and the message pump.
//!
//! This crate provides:
//! - Layered configuration loading with figment ([`ConfigLoader`])
//! - Logging setup on `tracing-subscriber` ([`LoggingBuilder`])
//! - A message pump with sequential or worker-pool scheduling
//!   ([`SignetRuntime`])
//!
//! ```rust,ignore
//! use signet_runtime::SignetRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Loads signet.toml, installs logging, registers linked shapes
//!     let runtime = SignetRuntime::builder().build()?;
//!
//!     let inbound = runtime.inbound();
//!     tokio::spawn(async move {
//!         // A transport pushes JSON text here
//!         inbound.send(r#"{"post_type":"meta_event"}"#).await
//!     });
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, DispatchConfig, DispatchMode, EnvelopeConfig,
    EnvelopeLayout, LoggingConfig, SignetConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{Inbound, InboundSender, RuntimeBuilder, RuntimeStats, SignetRuntime};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span helpers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
