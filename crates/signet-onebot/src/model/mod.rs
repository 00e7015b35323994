//! OneBot v11 shapes and typed views.

pub mod event;
pub mod types;

pub use event::*;
pub use types::*;
