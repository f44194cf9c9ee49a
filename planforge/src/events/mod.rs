//! Event sinks for pipeline progress.
//!
//! The sequencer and step executor report every [`PipelineEvent`] through
//! an [`EventSink`]. Jobs use a sink that appends to the job log; tests use
//! [`CollectingEventSink`].
//!
//! [`PipelineEvent`]: crate::core::PipelineEvent

mod sink;

pub use sink::{CollectingEventSink, EventSink, FnEventSink, LoggingEventSink, NoOpEventSink};
