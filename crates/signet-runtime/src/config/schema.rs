//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignetConfig {
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Message pump scheduling.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Envelope layout of inbound messages.
    #[serde(default)]
    pub envelope: EnvelopeConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation for `output = "file"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level. `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, required for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids in log lines.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of the log call.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `signet_core = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// How the pump schedules ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One pump task ingests messages in arrival order.
    #[default]
    Sequential,
    /// `workers` tasks share the inbound queue. Handlers of one event still
    /// run in registration order; different events run concurrently.
    Pool,
}

/// Dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,

    /// Worker tasks in pool mode.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the inbound queue. Senders wait when it is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Default per-handler timeout in milliseconds. Unset means no timeout.
    #[serde(default)]
    pub handler_timeout_ms: Option<u64>,
}

impl DispatchConfig {
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }

    /// Number of pump tasks for the configured mode.
    pub fn effective_workers(&self) -> usize {
        match self.mode {
            DispatchMode::Sequential => 1,
            DispatchMode::Pool => self.workers,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Sequential,
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            handler_timeout_ms: None,
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

// =============================================================================
// Envelope
// =============================================================================

/// Envelope layout of inbound messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeLayout {
    /// Three named discriminator fields.
    #[default]
    Explicit,
    /// OneBot v11 `<post_type>_type` fields. The extractor comes from the
    /// protocol crate.
    OnebotV11,
}

/// Envelope configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default)]
    pub layout: EnvelopeLayout,

    #[serde(default = "default_post_type_field")]
    pub post_type_field: String,

    #[serde(default = "default_sub_type_field")]
    pub sub_type_field: String,

    #[serde(default = "default_detail_type_field")]
    pub detail_type_field: String,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            layout: EnvelopeLayout::Explicit,
            post_type_field: default_post_type_field(),
            sub_type_field: default_sub_type_field(),
            detail_type_field: default_detail_type_field(),
        }
    }
}

fn default_post_type_field() -> String {
    "post_type".to_string()
}

fn default_sub_type_field() -> String {
    "sub_type".to_string()
}

fn default_detail_type_field() -> String {
    "detail_type".to_string()
}
