//! Event sink trait and implementations.

use parking_lot::RwLock;
use std::fmt;
use tracing::{debug, info, warn, Level};

use crate::core::PipelineEvent;

/// Receives pipeline events.
///
/// `emit` is synchronous so that appending to a log and broadcasting to
/// subscribers happen as one unit. Implementations must not panic.
pub trait EventSink: Send + Sync {
    /// Emits an event.
    fn emit(&self, event: PipelineEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub const fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub const fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: PipelineEvent) {
        let event_type = event.event_type();
        let step = event.step().map(|step| step.as_str());

        match &event {
            PipelineEvent::StepFailed { error, category, .. } => {
                warn!(event_type, step, %category, error = %error, "Event: {}", event_type);
            }
            PipelineEvent::OrchestrationFailed { error, .. } => {
                warn!(event_type, step, error = %error, "Event: {}", event_type);
            }
            _ if self.level == Level::DEBUG => {
                debug!(event_type, step, event_data = ?event, "Event: {}", event_type);
            }
            _ => {
                info!(event_type, step, "Event: {}", event_type);
            }
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the event type names, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(PipelineEvent::event_type).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events of the given type.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: PipelineEvent) {
        self.events.write().push(event);
    }
}

/// An event sink backed by a closure.
pub struct FnEventSink<F>(F);

impl<F> FnEventSink<F>
where
    F: Fn(PipelineEvent) + Send + Sync,
{
    /// Wraps `func` as a sink.
    pub const fn new(func: F) -> Self {
        Self(func)
    }
}

impl<F> fmt::Debug for FnEventSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnEventSink")
    }
}

impl<F> EventSink for FnEventSink<F>
where
    F: Fn(PipelineEvent) + Send + Sync,
{
    fn emit(&self, event: PipelineEvent) {
        (self.0)(event);
    }
}
