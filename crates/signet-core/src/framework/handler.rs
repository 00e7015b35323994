//! Handler system.
//!
//! A [`Handler`] receives the shared [`EventContext`] of a dispatched event.
//! The trait is implemented for every async closure or function taking
//! `Arc<EventContext>` and returning `anyhow::Result<()>`, similar to Axum's
//! handler system. Synchronous closures are adapted with [`sync_handler`].
//!
//! # Example
//!
//! ```rust,ignore
//! async fn audit(ctx: Arc<EventContext>) -> HandlerResult {
//!     let notice: ChannelUpdatedNotice = ctx.view()?;
//!     info!(channel = %notice.channel_id, "Channel updated");
//!     Ok(())
//! }
//!
//! registry.subscribe(EventKey::notice("guild", "channel_updated"), audit);
//! registry.subscribe(Topic::Any, sync_handler(|ctx| {
//!     debug!(key = %ctx.key(), "Seen");
//!     Ok(())
//! }));
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::foundation::event::EventContext;

/// What a handler returns.
pub type HandlerResult = anyhow::Result<()>;

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for event handlers.
///
/// # Blanket Implementation
///
/// Implemented for any `Fn(Arc<EventContext>) -> Fut` where `Fut` resolves
/// to [`HandlerResult`]:
///
/// ```rust,ignore
/// async fn log_all(ctx: Arc<EventContext>) -> HandlerResult { Ok(()) }
/// let closure = |ctx: Arc<EventContext>| async move { Ok(()) };
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles one event.
    fn call(&self, ctx: Arc<EventContext>) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<EventContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Arc<EventContext>) -> BoxFuture<'static, HandlerResult> {
        (self)(ctx).boxed()
    }
}

/// A type-erased, shareable handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Converts a handler into a [`BoxedHandler`].
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}

/// Adapts a synchronous closure into a handler.
pub fn sync_handler<F>(
    f: F,
) -> impl Fn(Arc<EventContext>) -> std::future::Ready<HandlerResult> + Send + Sync + 'static
where
    F: Fn(&EventContext) -> HandlerResult + Send + Sync + 'static,
{
    move |ctx| std::future::ready(f(&ctx))
}
