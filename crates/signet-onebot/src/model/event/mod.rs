//! The OneBot v11 shape table.
//!
//! Every shape is an [`EventDescriptor`]: a key, a name and a field schema.
//! [`register_standard`] adds the whole table to a registry builder.
//!
//! ```text
//! message/*/{private, group, guild}                    cancellable
//! notice/*/{group_upload, group_ban, essence, ...}
//! notice/{poke, lucky_king, honor}/notify
//! notice/guild/{channel_created, channel_updated, ...}
//! request/*/{friend, group}
//! meta_event/*/{lifecycle, heartbeat}
//! ```
//!
//! The typed views in the submodules read a decoded event through
//! [`TypedEvent::view`](signet_core::TypedEvent::view):
//!
//! ```rust,ignore
//! let notice: ChannelUpdatedNotice = ctx.view()?;
//! ```

pub mod guild;
pub mod message;
pub mod meta;
pub mod notice;
pub mod request;

use signet_core::{DuplicateKeyError, EventDescriptor, SchemaRegistry, SchemaRegistryBuilder};
use signet_macros::shape_provider;

pub use guild::*;
pub use message::*;
pub use meta::*;
pub use notice::*;
pub use request::*;

/// All standard shapes, in registration order.
pub fn standard_descriptors() -> Vec<EventDescriptor> {
    let mut all = message::descriptors();
    all.extend(notice::descriptors());
    all.extend(guild::descriptors());
    all.extend(request::descriptors());
    all.extend(meta::descriptors());
    all
}

/// Registers the standard OneBot v11 shapes.
///
/// Also linked into [`SHAPE_PROVIDERS`](signet_core::SHAPE_PROVIDERS), so
/// [`SchemaRegistryBuilder::register_linked`] picks it up. Use one or the
/// other: calling both registers every key twice.
#[shape_provider]
pub fn register_standard(builder: &mut SchemaRegistryBuilder) -> Result<(), DuplicateKeyError> {
    builder.register_all(standard_descriptors())?;
    Ok(())
}

/// A registry holding only the standard shapes.
pub fn standard_registry() -> Result<SchemaRegistry, DuplicateKeyError> {
    let mut builder = SchemaRegistry::builder();
    register_standard(&mut builder)?;
    Ok(builder.build())
}
