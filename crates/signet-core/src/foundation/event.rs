//! Typed events and the context handlers receive.
//!
//! - [`TypedEvent`] - a decoded message: its key, its shape and its fields
//! - [`EventContext`] - wraps a shared event plus propagation state
//!
//! # Example
//!
//! ```rust,ignore
//! registry.subscribe(key, |ctx: Arc<EventContext>| async move {
//!     let guild = ctx.id("guild_id").cloned().unwrap_or_default();
//!     info!(%guild, "channel updated");
//!     Ok(())
//! });
//! ```

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use tracing::debug;

use crate::error::DecodeError;
use crate::foundation::key::EventKey;
use crate::foundation::value::{FieldValue, Id, Record};
use crate::foundation::view::FromRecord;
use crate::framework::descriptor::EventDescriptor;

// ============================================================================
// Typed Event
// ============================================================================

/// A decoded event.
///
/// `key` is the key read from the envelope. It equals the descriptor's key,
/// except when a sub-type-agnostic descriptor matched, in which case it still
/// carries the concrete sub-type.
///
/// Immutable once built. Equality compares the key, the shape name and the
/// fields.
#[derive(Debug, Clone)]
pub struct TypedEvent {
    key: EventKey,
    descriptor: Arc<EventDescriptor>,
    fields: Record,
}

impl TypedEvent {
    /// Creates an event.
    pub fn new(key: EventKey, descriptor: Arc<EventDescriptor>, fields: Record) -> Self {
        Self {
            key,
            descriptor,
            fields,
        }
    }

    pub fn key(&self) -> &EventKey {
        &self.key
    }

    /// Returns the descriptor of the shape this event was decoded with.
    pub fn descriptor(&self) -> &Arc<EventDescriptor> {
        &self.descriptor
    }

    /// Returns the display name of the shape.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn into_fields(self) -> Record {
        self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn id(&self, name: &str) -> Option<&Id> {
        self.fields.id(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.fields.str(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.fields.int(name)
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        self.fields.record(name)
    }

    /// Builds a typed view of this event.
    pub fn view<T: FromRecord>(&self) -> Result<T, DecodeError> {
        T::from_record(&self.fields)
    }
}

impl PartialEq for TypedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.descriptor.name() == other.descriptor.name()
            && self.fields == other.fields
    }
}

impl Serialize for TypedEvent {
    /// Serializes as a flat object: the three discriminators followed by the
    /// fields under their semantic names.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
        map.serialize_entry("post_type", self.key.post_type().as_str())?;
        map.serialize_entry("sub_type", self.key.sub_type())?;
        map.serialize_entry("detail_type", self.key.detail_type())?;
        for (name, value) in self.fields.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Event Context
// ============================================================================

/// The object passed to handlers.
///
/// Dereferences to the [`TypedEvent`]. One context is shared by every handler
/// of a dispatch, so a handler can stop propagation for the ones after it
/// when the shape is cancellable.
pub struct EventContext {
    event: Arc<TypedEvent>,
    is_propagating: AtomicBool,
}

impl EventContext {
    /// Creates a context with propagation enabled.
    pub fn new(event: Arc<TypedEvent>) -> Self {
        Self {
            event,
            is_propagating: AtomicBool::new(true),
        }
    }

    /// Returns the shared event.
    pub fn event(&self) -> &Arc<TypedEvent> {
        &self.event
    }

    /// Whether handlers may stop propagation for this event.
    pub fn is_cancellable(&self) -> bool {
        self.event.descriptor().is_cancellable()
    }

    /// Stops the remaining handlers from receiving this event.
    ///
    /// Ignored for shapes that are not cancellable.
    pub fn stop_propagation(&self) {
        if self.is_cancellable() {
            self.is_propagating.store(false, Ordering::SeqCst);
        } else {
            debug!(
                key = %self.event.key(),
                "Ignoring stop_propagation on a non-cancellable event"
            );
        }
    }

    pub fn is_propagating(&self) -> bool {
        self.is_propagating.load(Ordering::SeqCst)
    }
}

impl Deref for EventContext {
    type Target = TypedEvent;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}

impl std::fmt::Debug for EventContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventContext")
            .field("key", self.event.key())
            .field("is_propagating", &self.is_propagating())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::schema::Schema;

    fn event(cancellable: bool) -> Arc<TypedEvent> {
        let key = EventKey::notice("guild", "channel_updated");
        let descriptor = Arc::new(
            EventDescriptor::new(key.clone(), "channel_updated", Schema::default())
                .cancellable(cancellable),
        );
        let fields = Record::new().with("guild_id", FieldValue::Id(Id::from("1")));
        Arc::new(TypedEvent::new(key, descriptor, fields))
    }

    #[test]
    fn test_stop_propagation_only_when_cancellable() {
        let ctx = EventContext::new(event(false));
        ctx.stop_propagation();
        assert!(ctx.is_propagating());

        let ctx = EventContext::new(event(true));
        ctx.stop_propagation();
        assert!(!ctx.is_propagating());
    }

    #[test]
    fn test_serialize_flat() {
        let json = serde_json::to_value(&*event(false)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "post_type": "notice",
                "sub_type": "guild",
                "detail_type": "channel_updated",
                "guild_id": "1",
            })
        );
    }

    #[test]
    fn test_context_derefs_to_event() {
        let ctx = EventContext::new(event(false));
        assert_eq!(ctx.id("guild_id"), Some(&Id::from(1_i64)));
        assert_eq!(ctx.name(), "channel_updated");
    }
}
