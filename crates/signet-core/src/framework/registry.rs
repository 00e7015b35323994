//! Schema registry.
//!
//! Maps an [`EventKey`] to the [`EventDescriptor`] of its shape. Shapes are
//! registered on a [`SchemaRegistryBuilder`] at startup and frozen into a
//! [`SchemaRegistry`], which has no mutating methods and is read without
//! locks.
//!
//! Crates that ship shapes can also contribute a [`ShapeProvider`] to the
//! [`SHAPE_PROVIDERS`] link-time slice, usually through
//! `#[signet_macros::shape_provider]`. [`SchemaRegistryBuilder::register_linked`]
//! runs every contributed provider.
//!
//! ```rust,ignore
//! let mut builder = SchemaRegistry::builder();
//! builder.register(EventDescriptor::new(
//!     EventKey::notice("guild", "channel_updated"),
//!     "channel_updated",
//!     channel_updated_schema(),
//! ))?;
//! let registry = builder.build();
//!
//! assert!(registry.resolve(&EventKey::notice("guild", "channel_updated")).is_some());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use linkme::distributed_slice;
use tracing::{debug, trace};

use crate::error::DuplicateKeyError;
use crate::foundation::key::EventKey;
use crate::framework::descriptor::EventDescriptor;

// =============================================================================
// Shape Providers (linkme distributed slice)
// =============================================================================

/// Registers a set of shapes on a builder.
pub type ShapeProvider = fn(&mut SchemaRegistryBuilder) -> Result<(), DuplicateKeyError>;

/// Registry of shape providers.
/// Each crate that ships event shapes contributes one entry.
#[distributed_slice]
pub static SHAPE_PROVIDERS: [ShapeProvider];

// =============================================================================
// Builder
// =============================================================================

/// Collects descriptors before the registry is frozen.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    entries: HashMap<EventKey, Arc<EventDescriptor>>,
    order: Vec<EventKey>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under its key.
    ///
    /// Fails if a descriptor is already registered for the same key.
    pub fn register(
        &mut self,
        descriptor: EventDescriptor,
    ) -> Result<&mut Self, DuplicateKeyError> {
        let key = descriptor.key().clone();
        if self.entries.contains_key(&key) {
            return Err(DuplicateKeyError { key });
        }
        trace!(%key, name = descriptor.name(), "Registered event shape");
        self.order.push(key.clone());
        self.entries.insert(key, Arc::new(descriptor));
        Ok(self)
    }

    /// Registers every descriptor in `descriptors`, stopping at the first
    /// duplicate.
    pub fn register_all(
        &mut self,
        descriptors: impl IntoIterator<Item = EventDescriptor>,
    ) -> Result<&mut Self, DuplicateKeyError> {
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(self)
    }

    /// Runs a shape provider.
    pub fn register_with(
        &mut self,
        provider: ShapeProvider,
    ) -> Result<&mut Self, DuplicateKeyError> {
        provider(self)?;
        Ok(self)
    }

    /// Runs every provider contributed to [`SHAPE_PROVIDERS`].
    pub fn register_linked(&mut self) -> Result<&mut Self, DuplicateKeyError> {
        debug!(providers = SHAPE_PROVIDERS.len(), "Running linked shape providers");
        for provider in SHAPE_PROVIDERS.iter() {
            provider(self)?;
        }
        Ok(self)
    }

    /// Whether a descriptor is registered for exactly `key`.
    pub fn contains(&self, key: &EventKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Freezes the registry.
    pub fn build(self) -> SchemaRegistry {
        debug!(shapes = self.order.len(), "Schema registry frozen");
        SchemaRegistry {
            entries: self.entries,
            order: self.order,
        }
    }
}

// =============================================================================
// Frozen Registry
// =============================================================================

/// A read-only map from event keys to shape descriptors.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    entries: HashMap<EventKey, Arc<EventDescriptor>>,
    order: Vec<EventKey>,
}

impl SchemaRegistry {
    /// Starts building a registry.
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::new()
    }

    /// Looks up the descriptor for `key`.
    ///
    /// An exact match wins. Otherwise, when `key` has a sub-type, the
    /// sub-type-agnostic key `(post_type, "", detail_type)` is tried. Unknown
    /// keys resolve to `None`.
    pub fn resolve(&self, key: &EventKey) -> Option<Arc<EventDescriptor>> {
        if let Some(descriptor) = self.entries.get(key) {
            return Some(Arc::clone(descriptor));
        }
        key.without_sub_type()
            .and_then(|agnostic| self.entries.get(&agnostic))
            .map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &EventKey> {
        self.order.iter()
    }

    /// Returns the registered descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<EventDescriptor>> {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::schema::{FieldType, Schema};

    fn descriptor(key: EventKey) -> EventDescriptor {
        let name = key.detail_type().to_string();
        let schema = Schema::builder().required("time", FieldType::Int).build();
        EventDescriptor::new(key, name, schema)
    }

    #[test]
    fn test_register_and_resolve_round_trip() {
        let key = EventKey::notice("guild", "channel_updated");
        let mut builder = SchemaRegistry::builder();
        builder.register(descriptor(key.clone())).unwrap();
        let registry = builder.build();

        let first = registry.resolve(&key).unwrap();
        let second = registry.resolve(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.key(), &key);
    }

    #[test]
    fn test_duplicate_key_fails() {
        let key = EventKey::notice("guild", "channel_updated");
        let mut builder = SchemaRegistry::builder();
        builder.register(descriptor(key.clone())).unwrap();

        let err = builder.register(descriptor(key.clone())).unwrap_err();
        assert_eq!(err, DuplicateKeyError { key });
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_unknown_key_resolves_to_none() {
        let registry = SchemaRegistry::builder().build();
        assert!(registry.resolve(&EventKey::notice("", "group_upload")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sub_type_agnostic_fallback() {
        let mut builder = SchemaRegistry::builder();
        builder
            .register(descriptor(EventKey::message("", "group")))
            .unwrap()
            .register(descriptor(EventKey::message("anonymous", "group")))
            .unwrap();
        let registry = builder.build();

        let normal = registry.resolve(&EventKey::message("normal", "group")).unwrap();
        assert!(normal.key().is_sub_type_agnostic());

        let anonymous = registry
            .resolve(&EventKey::message("anonymous", "group"))
            .unwrap();
        assert_eq!(anonymous.key().sub_type(), "anonymous");

        assert!(registry.resolve(&EventKey::message("normal", "private")).is_none());
    }

    #[test]
    fn test_keys_in_registration_order() {
        let keys = [
            EventKey::meta("", "heartbeat"),
            EventKey::notice("", "group_ban"),
            EventKey::request("", "friend"),
        ];
        let mut builder = SchemaRegistry::builder();
        builder
            .register_all(keys.iter().cloned().map(descriptor))
            .unwrap();
        let registry = builder.build();

        assert_eq!(registry.keys().cloned().collect::<Vec<_>>(), keys);
        assert_eq!(registry.descriptors().count(), 3);
    }
}
