//! Integration layer - the seams to external collaborators.
//!
//! - [`envelope`] - reading the event key out of a raw message
//! - [`sink`] - where per-message failures are reported

pub mod envelope;
pub mod sink;

pub use envelope::{FieldKeyExtractor, KeyExtractor};
pub use sink::{
    BoxedSink, ChannelSink, CollectingSink, ErrorSink, SinkStats, StatsSink, TracingSink,
};
