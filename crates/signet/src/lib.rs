//! # Signet
//!
//! Schema-driven event decoding and dispatch for OneBot bots.
//!
//! ## Overview
//!
//! Inbound JSON events are keyed by their envelope, decoded against a
//! registered shape, and delivered to subscribed handlers:
//!
//! ```text
//! ┌───────────┐    ┌──────────────┐    ┌─────────┐    ┌──────────────────┐
//! │ transport │───▶│ KeyExtractor │───▶│ Decoder │───▶│ HandlerRegistry  │──▶ handlers
//! │  (JSON)   │    │  EventKey    │    │ Schema  │    │ specific, then * │
//! └───────────┘    └──────────────┘    └─────────┘    └──────────────────┘
//!                         │                 │                  │
//!                         └─────────────────┴──────────────────┴──▶ ErrorSink
//! ```
//!
//! - [`core`]: keys, schemas, the decoder, the dispatcher and handler registry
//! - [`onebot`]: the OneBot v11 shape table and envelope layout (`onebot` feature)
//! - [`runtime`]: configuration, logging and the message pump
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use signet::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SignetRuntime::builder().onebot().build()?;
//!
//!     runtime.handlers().subscribe(
//!         EventKey::notice("guild", "channel_updated"),
//!         sync_handler(|ctx| {
//!             let notice: ChannelUpdatedNotice = ctx.view()?;
//!             info!(guild = %notice.guild_id, "Channel updated");
//!             Ok(())
//!         }),
//!     );
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `onebot` *(default)*: OneBot v11 shapes and [`RuntimeBuilderExt`]
//! - `toml-config` *(default)* / `yaml-config`: config file formats
//! - `json-log`: JSON log lines

pub use signet_core as core;
pub use signet_macros::{FromRecord, shape_provider};
#[cfg(feature = "onebot")]
pub use signet_onebot as onebot;
pub use signet_runtime as runtime;

/// OneBot wiring for [`RuntimeBuilder`](signet_runtime::RuntimeBuilder).
#[cfg(feature = "onebot")]
pub trait RuntimeBuilderExt {
    /// Reads envelopes with the OneBot v11 layout.
    ///
    /// The standard shapes are linked through `#[shape_provider]`, so the
    /// builder's default registry already contains them.
    fn onebot(self) -> Self;
}

#[cfg(feature = "onebot")]
impl RuntimeBuilderExt for signet_runtime::RuntimeBuilder {
    fn onebot(self) -> Self {
        self.extractor(signet_onebot::OneBotKeyExtractor)
    }
}

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use signet::prelude::*;
/// ```
pub mod prelude {
    // Core types: keys, events, handlers
    pub use signet_core::prelude::*;
    pub use signet_core::{IngestOutcome, InvocationMode, Topic};

    // Typed views
    pub use signet_macros::FromRecord;

    // Runtime - main entry point
    pub use signet_runtime::{SignetConfig, SignetRuntime};

    // Logging macros
    pub use signet_runtime::prelude::*;

    // OneBot shapes and views
    #[cfg(feature = "onebot")]
    pub use super::RuntimeBuilderExt;
    #[cfg(feature = "onebot")]
    pub use signet_onebot::{
        ChannelInfo, ChannelUpdatedNotice, FriendRequest, GroupMessage, GroupRequest, Heartbeat,
        OneBotKeyExtractor, PokeNotify, PrivateMessage, Sender,
    };
}

#[cfg(all(test, feature = "onebot"))]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_onebot_runtime_builds_with_linked_shapes() {
        let mut config = SignetConfig::default();
        config.envelope.layout = signet_runtime::EnvelopeLayout::OnebotV11;

        let runtime = SignetRuntime::builder()
            .config(config)
            .init_logging(false)
            .onebot()
            .build()
            .unwrap();

        assert!(
            runtime
                .dispatcher()
                .schemas()
                .resolve(&EventKey::notice("guild", "channel_updated"))
                .is_some()
        );
    }
}
