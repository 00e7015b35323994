//! Procedural macros for the Signet OneBot SDK.
//!
//! This crate provides:
//!
//! - `#[derive(FromRecord)]` - typed views over decoded records
//! - `#[shape_provider]` - contributes a shape provider to the link-time
//!   registry in `signet-core`
//!
//! Generated code refers to `::signet_core`, so crates using these macros
//! depend on `signet-core` directly.

mod record;
mod shape;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `FromRecord` and `FromFieldValue` for a struct with named fields.
///
/// Every field is read from the record entry of the same name, or from the
/// name given with `#[field(rename = "...")]`. Field types implement
/// `FromFieldValue`; `Option<T>` fields accept an absent entry. Nested types
/// deriving `FromRecord` can be used as fields and inside `Vec`s, and their
/// errors report the full path (`old_info.slow_modes[1].slow_mode_key`).
///
/// # Example
///
/// ```rust,ignore
/// use signet_macros::FromRecord;
///
/// #[derive(Debug, Clone, FromRecord)]
/// pub struct SlowModeInfo {
///     pub slow_mode_key: i32,
///     pub slow_mode_text: String,
///     pub speak_frequency: i32,
///     #[field(rename = "slow_mode_circle")]
///     pub circle: i32,
/// }
/// ```
#[proc_macro_derive(FromRecord, attributes(field))]
pub fn derive_from_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match record::derive_from_record(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Registers a function as a shape provider.
///
/// Leaves the function unchanged and appends a
/// `#[::signet_core::linkme::distributed_slice]` static wiring it into
/// `signet_core::SHAPE_PROVIDERS`, so
/// `SchemaRegistryBuilder::register_linked` runs it.
///
/// ```rust,ignore
/// #[shape_provider]
/// fn audit_shapes(builder: &mut SchemaRegistryBuilder) -> Result<(), DuplicateKeyError> {
///     builder.register(EventDescriptor::new(key, "audit", schema))?;
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn shape_provider(attr: TokenStream, item: TokenStream) -> TokenStream {
    shape::shape_provider(attr, item)
}
