//! The message pump.
//!
//! A [`SignetRuntime`] owns a [`Dispatcher`] and a bounded inbound queue.
//! Transports push messages through an [`InboundSender`]; pump tasks pull
//! them off the queue and call [`Dispatcher::ingest`].
//!
//! ```text
//! transport ──InboundSender──▶ [ queue ] ──▶ pump task(s) ──▶ Dispatcher::ingest
//!                                              sequential: 1
//!                                              pool:       dispatch.workers
//! ```
//!
//! On shutdown the pumps stop waiting for new messages, drain what is
//! already queued, and exit.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use signet_runtime::SignetRuntime;
//!
//! let runtime = SignetRuntime::builder().build()?;
//! runtime.handlers().subscribe(Topic::Any, sync_handler(|ctx| {
//!     tracing::info!(event = ctx.name(), "Received");
//!     Ok(())
//! }));
//!
//! let inbound = runtime.inbound();
//! tokio::spawn(async move { inbound.send(line).await });
//!
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use signet_core::{
    BoxedSink, Dispatcher, ErrorSink, FieldKeyExtractor, HandlerRegistry, IngestOutcome,
    KeyExtractor, RawMessage, SchemaRegistry, SinkStats, StatsSink, TracingSink,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use crate::config::{ConfigLoader, EnvelopeLayout, SignetConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

// =============================================================================
// Inbound
// =============================================================================

/// One message for the pump.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// JSON text, parsed by the pump.
    Text(String),
    Value(Value),
    Raw(RawMessage),
}

impl From<String> for Inbound {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Inbound {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for Inbound {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<RawMessage> for Inbound {
    fn from(raw: RawMessage) -> Self {
        Self::Raw(raw)
    }
}

/// Pushes messages into a runtime's inbound queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: mpsc::Sender<Inbound>,
    shutdown: CancellationToken,
}

impl InboundSender {
    /// Queues one message, waiting while the queue is full.
    pub async fn send(&self, message: impl Into<Inbound>) -> RuntimeResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(RuntimeError::InboundClosed);
        }
        self.tx
            .send(message.into())
            .await
            .map_err(|_| RuntimeError::InboundClosed)
    }

    /// Queues every item of `messages`, returning how many were queued.
    ///
    /// Stops early when the runtime shuts down.
    pub async fn feed<S>(&self, messages: S) -> RuntimeResult<u64>
    where
        S: Stream,
        S::Item: Into<Inbound>,
    {
        let mut messages = std::pin::pin!(messages);
        let mut sent = 0;
        while let Some(message) = messages.next().await {
            self.send(message).await?;
            sent += 1;
        }
        Ok(sent)
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.tx.is_closed()
    }
}

// =============================================================================
// Stats
// =============================================================================

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    dispatched: AtomicU64,
    unhandled: AtomicU64,
}

/// Snapshot of runtime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Messages pulled off the queue.
    pub received: u64,
    /// Messages decoded and delivered to the handler registry.
    pub dispatched: u64,
    /// Dispatched events no handler was subscribed to.
    pub unhandled: u64,
    /// Failures reported to the error sink, per category.
    pub errors: SinkStats,
}

// =============================================================================
// SignetRuntime
// =============================================================================

/// Owns a dispatcher and pumps inbound messages into it.
pub struct SignetRuntime {
    config: SignetConfig,
    dispatcher: Dispatcher,
    stats_sink: StatsSink,
    counters: Arc<Counters>,
    tx: mpsc::Sender<Inbound>,
    rx: Mutex<Option<mpsc::Receiver<Inbound>>>,
    shutdown: CancellationToken,
}

impl SignetRuntime {
    /// Creates a runtime builder.
    ///
    /// Without further settings the builder loads configuration from the
    /// default locations and registers every linked shape provider.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &SignetConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Shorthand for `dispatcher().handlers()`.
    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        self.dispatcher.handlers()
    }

    /// Returns a sender for the inbound queue.
    pub fn inbound(&self) -> InboundSender {
        InboundSender {
            tx: self.tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            received: self.counters.received.load(Ordering::Relaxed),
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            unhandled: self.counters.unhandled.load(Ordering::Relaxed),
            errors: self.stats_sink.stats(),
        }
    }

    /// A token that stops the runtime when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Requests shutdown. Queued messages are still processed.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Runs until Ctrl+C, SIGTERM or [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Signet runtime is now running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes or [`shutdown`](Self::shutdown) is
    /// called, then drains the queue.
    ///
    /// A runtime runs once; a second call returns
    /// [`RuntimeError::AlreadyRunning`].
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let rx = self.rx.lock().take().ok_or(RuntimeError::AlreadyRunning)?;
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = self.config.dispatch.effective_workers();
        info!(
            mode = ?self.config.dispatch.mode,
            workers,
            shapes = self.dispatcher.schemas().len(),
            "Starting Signet runtime"
        );

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            tasks.spawn(
                pump(
                    Arc::clone(&rx),
                    self.dispatcher.clone(),
                    Arc::clone(&self.counters),
                    self.shutdown.clone(),
                )
                .instrument(info_span!("pump", worker)),
            );
        }

        tokio::select! {
            _ = shutdown => debug!("Shutdown future completed"),
            _ = self.shutdown.cancelled() => debug!("Shutdown requested"),
        }
        self.shutdown.cancel();

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Pump task failed");
            }
        }

        let stats = self.stats();
        info!(
            received = stats.received,
            dispatched = stats.dispatched,
            errors = stats.errors.total(),
            "Signet runtime stopped"
        );
        Ok(())
    }
}

impl std::fmt::Debug for SignetRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignetRuntime")
            .field("mode", &self.config.dispatch.mode)
            .field("stats", &self.stats())
            .field("running", &self.rx.lock().is_none())
            .finish()
    }
}

/// One pump task: pull, ingest, repeat. Drains the queue after shutdown.
async fn pump(
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Inbound>>>,
    dispatcher: Dispatcher,
    counters: Arc<Counters>,
    shutdown: CancellationToken,
) {
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                message = rx.recv() => message,
            }
        };
        match next {
            Some(message) => process(&dispatcher, &counters, message).await,
            None => break,
        }
    }

    // Fails parked and later sends; buffered messages stay readable.
    rx.lock().await.close();
    loop {
        let next = rx.lock().await.try_recv();
        match next {
            Ok(message) => process(&dispatcher, &counters, message).await,
            Err(_) => break,
        }
    }
    trace!("Pump stopped");
}

async fn process(dispatcher: &Dispatcher, counters: &Counters, message: Inbound) {
    counters.received.fetch_add(1, Ordering::Relaxed);

    let outcome = match message {
        Inbound::Text(text) => dispatcher.ingest_str(&text).await,
        Inbound::Value(value) => dispatcher.ingest_value(value).await,
        Inbound::Raw(raw) => dispatcher.ingest(&raw).await,
    };

    if let IngestOutcome::Dispatched { key, report } = outcome {
        counters.dispatched.fetch_add(1, Ordering::Relaxed);
        if report.is_unhandled() {
            counters.unhandled.fetch_add(1, Ordering::Relaxed);
            trace!(%key, "No handler subscribed");
        }
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => on_ctrl_c(result),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    on_ctrl_c(signal::ctrl_c().await);
}

fn on_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`SignetRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<SignetConfig>,
    schemas: Option<SchemaRegistry>,
    extractor: Option<Arc<dyn KeyExtractor>>,
    sink: Option<BoxedSink>,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config: None,
            schemas: None,
            extractor: None,
            sink: None,
            init_logging: true,
        }
    }

    /// Uses this configuration instead of loading one. It is still
    /// validated.
    pub fn config(mut self, config: SignetConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration below files and environment variables.
    pub fn merge(mut self, config: SignetConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses this schema registry instead of the linked shape providers.
    pub fn schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// Overrides the extractor chosen by `envelope.layout`.
    pub fn extractor(mut self, extractor: impl KeyExtractor) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    /// Sets the error sink. Runtime stats count errors before forwarding
    /// them here. Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: impl ErrorSink) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Whether `build` installs the global tracing subscriber (default:
    /// true).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    pub fn build(self) -> RuntimeResult<SignetRuntime> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let schemas = match self.schemas {
            Some(schemas) => schemas,
            None => {
                let mut builder = SchemaRegistry::builder();
                builder.register_linked()?;
                builder.build()
            }
        };

        let extractor: Arc<dyn KeyExtractor> = match (self.extractor, config.envelope.layout) {
            (Some(extractor), _) => extractor,
            (None, EnvelopeLayout::Explicit) => Arc::new(FieldKeyExtractor::new(
                config.envelope.post_type_field.clone(),
                config.envelope.sub_type_field.clone(),
                config.envelope.detail_type_field.clone(),
            )),
            (None, layout) => return Err(RuntimeError::MissingExtractor(layout)),
        };

        let stats_sink = match self.sink {
            Some(sink) => StatsSink::new(sink),
            None => StatsSink::new(TracingSink),
        };

        let dispatcher = Dispatcher::builder(schemas)
            .extractor(extractor)
            .sink(stats_sink.clone())
            .handler_timeout(config.dispatch.handler_timeout())
            .build();

        let (tx, rx) = mpsc::channel(config.dispatch.queue_capacity);

        info!(
            shapes = dispatcher.schemas().len(),
            layout = ?config.envelope.layout,
            queue_capacity = config.dispatch.queue_capacity,
            "Runtime initialized from configuration"
        );

        Ok(SignetRuntime {
            config,
            dispatcher,
            stats_sink,
            counters: Arc::default(),
            tx,
            rx: Mutex::new(Some(rx)),
            shutdown: CancellationToken::new(),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchMode;
    use serde_json::json;
    use signet_core::prelude::*;
    use signet_core::{CollectingSink, FieldType, sync_handler};
    use std::collections::HashMap;
    use std::time::Duration;

    fn schemas() -> SchemaRegistry {
        let mut builder = SchemaRegistry::builder();
        builder
            .register(EventDescriptor::new(
                EventKey::notice("guild", "channel_updated"),
                "notice.guild.channel_updated",
                Schema::builder()
                    .required("guild_id", FieldType::Id)
                    .required("channel_id", FieldType::Id)
                    .required("operator_id", FieldType::Id)
                    .build(),
            ))
            .unwrap();
        builder.build()
    }

    fn runtime(mode: DispatchMode) -> SignetRuntime {
        let mut config = SignetConfig::default();
        config.dispatch.mode = mode;
        config.dispatch.workers = 4;
        SignetRuntime::builder()
            .config(config)
            .schemas(schemas())
            .init_logging(false)
            .build()
            .unwrap()
    }

    fn event(n: u64) -> Value {
        json!({
            "post_type": "notice",
            "sub_type": "guild",
            "detail_type": "channel_updated",
            "guild_id": n,
            "channel_id": "c",
            "operator_id": "o"
        })
    }

    #[tokio::test]
    async fn test_sequential_delivers_in_order() {
        let runtime = runtime(DispatchMode::Sequential);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let out = Arc::clone(&seen);
        runtime.handlers().subscribe(
            Topic::Any,
            sync_handler(move |ctx| {
                out.lock().push(ctx.id("guild_id").map(|id| id.to_string()));
                Ok(())
            }),
        );

        let inbound = runtime.inbound();
        for n in 0..20 {
            inbound.send(event(n)).await.unwrap();
        }
        runtime.run_until(async {}).await.unwrap();

        let expected: Vec<_> = (0..20).map(|n| Some(n.to_string())).collect();
        assert_eq!(*seen.lock(), expected);
        assert_eq!(runtime.stats().received, 20);
        assert_eq!(runtime.stats().dispatched, 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_keeps_per_event_handler_order() {
        let runtime = runtime(DispatchMode::Pool);
        let calls = Arc::new(parking_lot::Mutex::new(HashMap::<String, Vec<&str>>::new()));

        for label in ["first", "second"] {
            let calls = Arc::clone(&calls);
            runtime.handlers().subscribe(
                EventKey::notice("guild", "channel_updated"),
                move |ctx: Arc<EventContext>| {
                    let calls = Arc::clone(&calls);
                    async move {
                        tokio::task::yield_now().await;
                        let guild = ctx.id("guild_id").map(|id| id.to_string()).unwrap_or_default();
                        calls.lock().entry(guild).or_default().push(label);
                        Ok::<_, anyhow::Error>(())
                    }
                },
            );
        }

        let inbound = runtime.inbound();
        let sent = inbound
            .feed(futures::stream::iter((0..50).map(event)))
            .await
            .unwrap();
        assert_eq!(sent, 50);
        runtime.run_until(async {}).await.unwrap();

        let calls = calls.lock();
        assert_eq!(calls.len(), 50);
        assert!(calls.values().all(|order| *order == ["first", "second"]));
        assert_eq!(runtime.stats().dispatched, 50);
    }

    #[tokio::test]
    async fn test_shutdown_while_running() {
        let runtime = Arc::new(runtime(DispatchMode::Pool));
        let inbound = runtime.inbound();

        let task = tokio::spawn({
            let runtime = Arc::clone(&runtime);
            async move { runtime.run_until(std::future::pending()).await }
        });

        inbound.send(event(1)).await.unwrap();
        inbound.send("not json").await.unwrap();
        for _ in 0..100 {
            if runtime.stats().received == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        runtime.shutdown();
        task.await.unwrap().unwrap();

        let stats = runtime.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.unhandled, 1);
        assert_eq!(stats.errors.malformed_envelope, 1);
        assert!(inbound.is_closed());
        assert!(matches!(
            inbound.send(event(2)).await,
            Err(RuntimeError::InboundClosed)
        ));
        assert!(matches!(
            runtime.run_until(async {}).await,
            Err(RuntimeError::AlreadyRunning)
        ));
    }

    #[tokio::test]
    async fn test_send_parked_on_full_queue_fails_at_shutdown() {
        let mut config = SignetConfig::default();
        config.dispatch.queue_capacity = 1;
        let runtime = SignetRuntime::builder()
            .config(config)
            .schemas(schemas())
            .init_logging(false)
            .build()
            .unwrap();

        let handled = Arc::new(AtomicU64::new(0));
        let count = Arc::clone(&handled);
        runtime.handlers().subscribe(
            Topic::Any,
            sync_handler(move |_| {
                count.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }),
        );

        let inbound = runtime.inbound();
        inbound.send(event(1)).await.unwrap();
        let late = tokio::spawn({
            let inbound = inbound.clone();
            async move { inbound.send(event(2)).await }
        });
        // Let the second send park on the full queue.
        tokio::task::yield_now().await;

        runtime.run_until(async {}).await.unwrap();

        assert!(matches!(
            late.await.unwrap(),
            Err(RuntimeError::InboundClosed)
        ));
        assert_eq!(handled.load(Ordering::Relaxed), 1);
        assert_eq!(runtime.stats().received, 1);
    }

    #[tokio::test]
    async fn test_errors_reach_custom_sink_and_stats() {
        let sink = Arc::new(CollectingSink::new());
        let runtime = SignetRuntime::builder()
            .config(SignetConfig::default())
            .schemas(schemas())
            .sink(Arc::clone(&sink))
            .init_logging(false)
            .build()
            .unwrap();
        runtime.handlers().subscribe(
            Topic::Any,
            sync_handler(|_| Err(anyhow::anyhow!("handler failed"))),
        );

        let inbound = runtime.inbound();
        inbound.send(event(1)).await.unwrap();
        inbound
            .send(json!({"post_type": "notice", "detail_type": "mystery"}))
            .await
            .unwrap();
        runtime.run_until(async {}).await.unwrap();

        let stats = runtime.stats();
        assert_eq!(stats.errors.handler, 1);
        assert_eq!(stats.errors.unknown_shape, 1);
        assert_eq!(sink.kinds(), ["handler", "unknown_shape"]);
    }

    #[tokio::test]
    async fn test_custom_envelope_fields() {
        let mut config = SignetConfig::default();
        config.envelope.post_type_field = "kind".to_string();
        config.envelope.detail_type_field = "event".to_string();
        let runtime = SignetRuntime::builder()
            .config(config)
            .schemas(schemas())
            .init_logging(false)
            .build()
            .unwrap();

        runtime
            .inbound()
            .send(json!({
                "kind": "notice",
                "sub_type": "guild",
                "event": "channel_updated",
                "guild_id": "g",
                "channel_id": "c",
                "operator_id": "o"
            }))
            .await
            .unwrap();
        runtime.run_until(async {}).await.unwrap();

        assert_eq!(runtime.stats().dispatched, 1);
    }

    #[test]
    fn test_onebot_layout_needs_extractor() {
        let mut config = SignetConfig::default();
        config.envelope.layout = EnvelopeLayout::OnebotV11;
        let result = SignetRuntime::builder()
            .config(config.clone())
            .schemas(schemas())
            .init_logging(false)
            .build();
        assert!(matches!(
            result,
            Err(RuntimeError::MissingExtractor(EnvelopeLayout::OnebotV11))
        ));

        let result = SignetRuntime::builder()
            .config(config)
            .schemas(schemas())
            .extractor(FieldKeyExtractor::default())
            .init_logging(false)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SignetConfig::default();
        config.dispatch.queue_capacity = 0;
        let result = SignetRuntime::builder()
            .config(config)
            .schemas(schemas())
            .init_logging(false)
            .build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }
}
