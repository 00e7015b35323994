//! Handler registry.
//!
//! Subscriptions attach a [`Handler`] to a [`Topic`]: one event key, or every
//! event. On dispatch the handlers of the event's key run first, in
//! registration order, then the wildcard handlers, in registration order.
//!
//! # Failure Isolation
//!
//! Each handler runs isolated. A returned error, a panic or a timeout is
//! reported to the registry's [`ErrorSink`] as
//! [`DispatchError::Handler`] and the next handler still runs.
//!
//! Inline handlers without a timeout run on any executor. Detached handlers
//! and timeouts need a tokio runtime; without one they fail with
//! [`HandlerError::NoRuntime`] instead of running.
//!
//! # Concurrency
//!
//! The subscription table is a copy-on-write snapshot behind a
//! `parking_lot::RwLock`. Dispatch clones the snapshot `Arc` and iterates
//! without holding the lock, so subscribing or unsubscribing while events are
//! in flight never disturbs an ongoing dispatch.
//!
//! ```rust,ignore
//! let registry = HandlerRegistry::new();
//! let id = registry.subscribe(EventKey::notice("guild", "channel_updated"), audit);
//! registry.subscribe_with(Topic::Any, slow_logger, SubscribeOptions::detached());
//! registry.unsubscribe(id)?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{Instrument, Level, debug, span, trace};

use crate::error::{DispatchError, HandlerError, NotFoundError};
use crate::foundation::event::{EventContext, TypedEvent};
use crate::foundation::key::{EventKey, Topic};
use crate::framework::handler::{BoxedHandler, Handler, into_handler};
use crate::integration::sink::{BoxedSink, ErrorSink, TracingSink};

// ============================================================================
// Subscription Types
// ============================================================================

/// Identifies a subscription. Ids increase monotonically, so they double as
/// the registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a handler is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationMode {
    /// Awaited in order before the next handler runs.
    #[default]
    Inline,
    /// Spawned on the tokio runtime; the next handler runs immediately.
    Detached,
}

/// Options for [`HandlerRegistry::subscribe_with`].
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    mode: InvocationMode,
    name: Option<String>,
    timeout: Option<Duration>,
}

impl SubscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a detached handler.
    pub fn detached() -> Self {
        Self::default().mode(InvocationMode::Detached)
    }

    pub fn mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets a name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the registry's default handler timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

struct Subscription {
    id: SubscriptionId,
    handler: BoxedHandler,
    mode: InvocationMode,
    name: Option<String>,
    timeout: Option<Duration>,
}

impl Subscription {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

#[derive(Default, Clone)]
struct Snapshot {
    by_key: HashMap<EventKey, Vec<Arc<Subscription>>>,
    wildcard: Vec<Arc<Subscription>>,
    topics: HashMap<SubscriptionId, Topic>,
}

impl Snapshot {
    /// Handlers for `event`: key-specific ones by id, then wildcards by id.
    fn plan(&self, event: &TypedEvent) -> Vec<Arc<Subscription>> {
        let mut specific: Vec<Arc<Subscription>> = Vec::new();
        let descriptor_key = event.descriptor().key();
        for key in [event.key(), descriptor_key] {
            if let Some(subs) = self.by_key.get(key) {
                specific.extend(subs.iter().cloned());
            }
            if event.key() == descriptor_key {
                break;
            }
        }
        specific.sort_by_key(|sub| sub.id);
        specific.dedup_by_key(|sub| sub.id);
        specific.extend(self.wildcard.iter().cloned());
        specific
    }
}

/// Summary of one [`HandlerRegistry::dispatch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Inline handlers that ran.
    pub invoked: usize,
    /// Inline handlers that failed (error, panic or timeout).
    pub failed: usize,
    /// Handlers spawned in detached mode.
    pub detached: usize,
    /// Whether a handler stopped propagation before every handler ran.
    pub stopped: bool,
}

impl DispatchReport {
    /// Whether no handler was subscribed for the event.
    pub fn is_unhandled(&self) -> bool {
        self.invoked == 0 && self.detached == 0
    }
}

// ============================================================================
// Handler Registry
// ============================================================================

/// Subscriptions and their invocation.
pub struct HandlerRegistry {
    snapshot: RwLock<Arc<Snapshot>>,
    next_id: AtomicU64,
    sink: BoxedSink,
    default_timeout: Option<Duration>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry reporting to a [`TracingSink`].
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::default(),
            next_id: AtomicU64::new(1),
            sink: Arc::new(TracingSink),
            default_timeout: None,
        }
    }

    /// Sets the sink handler failures are reported to.
    pub fn with_sink(mut self, sink: impl ErrorSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub(crate) fn with_boxed_sink(mut self, sink: BoxedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the timeout applied to handlers without their own.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn sink(&self) -> &BoxedSink {
        &self.sink
    }

    /// Subscribes an inline handler.
    pub fn subscribe<H: Handler>(&self, topic: impl Into<Topic>, handler: H) -> SubscriptionId {
        self.subscribe_with(topic, handler, SubscribeOptions::default())
    }

    /// Subscribes a handler with explicit options.
    pub fn subscribe_with<H: Handler>(
        &self,
        topic: impl Into<Topic>,
        handler: H,
        options: SubscribeOptions,
    ) -> SubscriptionId {
        let topic = topic.into();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Arc::new(Subscription {
            id,
            handler: into_handler(handler),
            mode: options.mode,
            name: options.name,
            timeout: options.timeout,
        });

        let mut guard = self.snapshot.write();
        let mut next = Snapshot::clone(&guard);
        match &topic {
            Topic::Key(key) => next
                .by_key
                .entry(key.clone())
                .or_default()
                .push(subscription),
            Topic::Any => next.wildcard.push(subscription),
        }
        debug!(%id, %topic, "Subscribed handler");
        next.topics.insert(id, topic);
        *guard = Arc::new(next);
        id
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), NotFoundError> {
        let mut guard = self.snapshot.write();
        let mut next = Snapshot::clone(&guard);
        let topic = next.topics.remove(&id).ok_or(NotFoundError { id })?;
        match &topic {
            Topic::Key(key) => {
                if let Some(subs) = next.by_key.get_mut(key) {
                    subs.retain(|sub| sub.id != id);
                    if subs.is_empty() {
                        next.by_key.remove(key);
                    }
                }
            }
            Topic::Any => next.wildcard.retain(|sub| sub.id != id),
        }
        debug!(%id, %topic, "Unsubscribed handler");
        *guard = Arc::new(next);
        Ok(())
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.snapshot.read().topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        *self.snapshot.write() = Arc::default();
    }

    /// Returns the ids of the subscriptions `event` would be delivered to, in
    /// invocation order.
    pub fn matching(&self, event: &TypedEvent) -> Vec<SubscriptionId> {
        let snapshot = Arc::clone(&self.snapshot.read());
        snapshot.plan(event).iter().map(|sub| sub.id).collect()
    }

    /// Delivers `event` to its subscribers.
    pub async fn dispatch(&self, event: Arc<TypedEvent>) -> DispatchReport {
        let span = span!(Level::DEBUG, "dispatch", key = %event.key(), name = event.name());
        self.dispatch_inner(event).instrument(span).await
    }

    async fn dispatch_inner(&self, event: Arc<TypedEvent>) -> DispatchReport {
        let snapshot = Arc::clone(&self.snapshot.read());
        let plan = snapshot.plan(&event);
        let ctx = Arc::new(EventContext::new(event));
        let mut report = DispatchReport::default();

        for subscription in plan {
            if !ctx.is_propagating() {
                debug!(key = %ctx.key(), "Propagation stopped, skipping remaining handlers");
                report.stopped = true;
                break;
            }

            let timeout = subscription.timeout.or(self.default_timeout);
            match subscription.mode {
                InvocationMode::Inline => {
                    report.invoked += 1;
                    trace!(id = %subscription.id, handler = subscription.label(), "Invoking handler");
                    if let Err(source) =
                        invoke(&subscription.handler, Arc::clone(&ctx), timeout).await
                    {
                        report.failed += 1;
                        self.sink.report(DispatchError::Handler {
                            key: ctx.key().clone(),
                            subscription: subscription.id,
                            source,
                        });
                    }
                }
                InvocationMode::Detached => {
                    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                        report.failed += 1;
                        self.sink.report(DispatchError::Handler {
                            key: ctx.key().clone(),
                            subscription: subscription.id,
                            source: HandlerError::NoRuntime,
                        });
                        continue;
                    };
                    report.detached += 1;
                    let ctx = Arc::clone(&ctx);
                    let sink = Arc::clone(&self.sink);
                    runtime.spawn(
                        async move {
                            if let Err(source) =
                                invoke(&subscription.handler, Arc::clone(&ctx), timeout).await
                            {
                                sink.report(DispatchError::Handler {
                                    key: ctx.key().clone(),
                                    subscription: subscription.id,
                                    source,
                                });
                            }
                        }
                        .in_current_span(),
                    );
                }
            }
        }

        report
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("subscriptions", &self.len())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

/// Runs one handler, turning errors, panics and timeouts into
/// [`HandlerError`]s.
async fn invoke(
    handler: &BoxedHandler,
    ctx: Arc<EventContext>,
    timeout: Option<Duration>,
) -> Result<(), HandlerError> {
    if timeout.is_some() && tokio::runtime::Handle::try_current().is_err() {
        return Err(HandlerError::NoRuntime);
    }
    // A handler may panic before returning its future.
    let future = std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(ctx)))
        .map_err(|panic| HandlerError::Panicked(panic_message(panic.as_ref())))?;
    let guarded = AssertUnwindSafe(future).catch_unwind();

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, guarded)
            .await
            .map_err(|_| HandlerError::TimedOut(limit))?,
        None => guarded.await,
    };

    match outcome {
        Ok(result) => result.map_err(HandlerError::Failed),
        Err(panic) => Err(HandlerError::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
