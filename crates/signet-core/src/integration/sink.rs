//! Error sinks.
//!
//! Per-message failures never propagate to the caller of
//! [`Dispatcher::ingest`](crate::Dispatcher::ingest). They are reported to an
//! [`ErrorSink`] instead:
//!
//! - [`TracingSink`] - logs by severity (the default)
//! - [`CollectingSink`] - keeps errors in memory
//! - [`ChannelSink`] - forwards errors into a tokio channel
//! - [`StatsSink`] - counts errors per category, then forwards

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::{DispatchError, Severity};

/// Receives per-message failures. Fire-and-forget.
pub trait ErrorSink: Send + Sync + 'static {
    fn report(&self, error: DispatchError);
}

/// A shareable error sink.
pub type BoxedSink = Arc<dyn ErrorSink>;

impl<S: ErrorSink + ?Sized> ErrorSink for Arc<S> {
    fn report(&self, error: DispatchError) {
        (**self).report(error)
    }
}

// ============================================================================
// Tracing Sink
// ============================================================================

/// Logs every error through `tracing`.
///
/// Unknown shapes are expected with protocol extensions and are logged at
/// debug level; malformed envelopes and decode failures at warn; handler
/// failures at error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, error: DispatchError) {
        let kind = error.kind();
        let key = error.key().map(ToString::to_string).unwrap_or_default();
        match error.severity() {
            Severity::Info => debug!(kind, %key, "{error}"),
            Severity::Warn => warn!(kind, %key, "{error}"),
            Severity::Error => error!(kind, %key, "{error}"),
        }
    }
}

// ============================================================================
// Collecting Sink
// ============================================================================

/// Stores errors in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    errors: Mutex<Vec<DispatchError>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    /// Returns the `kind()` of every error collected so far.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.errors.lock().iter().map(DispatchError::kind).collect()
    }

    /// Removes and returns the collected errors.
    pub fn take(&self) -> Vec<DispatchError> {
        std::mem::take(&mut *self.errors.lock())
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, error: DispatchError) {
        self.errors.lock().push(error);
    }
}

// ============================================================================
// Channel Sink
// ============================================================================

/// Forwards errors into an unbounded tokio channel.
///
/// Errors are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DispatchError>,
}

impl ChannelSink {
    /// Creates a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DispatchError>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ErrorSink for ChannelSink {
    fn report(&self, error: DispatchError) {
        let _ = self.tx.send(error);
    }
}

// ============================================================================
// Stats Sink
// ============================================================================

/// A snapshot of [`StatsSink`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub malformed_envelope: u64,
    pub unknown_shape: u64,
    pub decode: u64,
    pub handler: u64,
}

impl SinkStats {
    pub fn total(&self) -> u64 {
        self.malformed_envelope + self.unknown_shape + self.decode + self.handler
    }
}

#[derive(Debug, Default)]
struct Counters {
    malformed_envelope: AtomicU64,
    unknown_shape: AtomicU64,
    decode: AtomicU64,
    handler: AtomicU64,
}

/// Counts errors per category and forwards them to an inner sink.
///
/// Clones share counters.
#[derive(Clone)]
pub struct StatsSink {
    counters: Arc<Counters>,
    inner: BoxedSink,
}

impl StatsSink {
    pub fn new(inner: impl ErrorSink) -> Self {
        Self {
            counters: Arc::default(),
            inner: Arc::new(inner),
        }
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            malformed_envelope: self.counters.malformed_envelope.load(Ordering::Relaxed),
            unknown_shape: self.counters.unknown_shape.load(Ordering::Relaxed),
            decode: self.counters.decode.load(Ordering::Relaxed),
            handler: self.counters.handler.load(Ordering::Relaxed),
        }
    }
}

impl Default for StatsSink {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

impl ErrorSink for StatsSink {
    fn report(&self, error: DispatchError) {
        let counter = match &error {
            DispatchError::MalformedEnvelope(_) => &self.counters.malformed_envelope,
            DispatchError::UnknownShape(_) => &self.counters.unknown_shape,
            DispatchError::Decode { .. } => &self.counters.decode,
            DispatchError::Handler { .. } => &self.counters.handler,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.inner.report(error);
    }
}

impl std::fmt::Debug for StatsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsSink")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, EnvelopeError};
    use crate::foundation::key::EventKey;
    use crate::foundation::value::ValueKind;

    fn decode_error() -> DispatchError {
        DispatchError::Decode {
            key: EventKey::notice("guild", "channel_updated"),
            source: DecodeError::MissingField("operator_id".into()),
        }
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.report(decode_error());
        sink.report(DispatchError::from(EnvelopeError::NotAnObject(ValueKind::Null)));

        assert_eq!(sink.kinds(), ["decode", "malformed_envelope"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_stats_sink_counts_and_forwards() {
        let inner = Arc::new(CollectingSink::new());
        let stats = StatsSink::new(Arc::clone(&inner));
        let clone = stats.clone();

        stats.report(decode_error());
        clone.report(DispatchError::UnknownShape(EventKey::notice("", "x")));

        let snapshot = stats.stats();
        assert_eq!(snapshot.decode, 1);
        assert_eq!(snapshot.unknown_shape, 1);
        assert_eq!(snapshot.total(), 2);
        assert_eq!(inner.len(), 2);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut rx) = ChannelSink::new();
        sink.report(decode_error());
        assert_eq!(rx.recv().await.map(|e| e.kind()), Some("decode"));

        drop(rx);
        sink.report(decode_error());
    }
}
