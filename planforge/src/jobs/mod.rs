//! Job registry and event bus.
//!
//! Each pipeline run is wrapped in a job with an append-only event log.
//! Subscribers get the full history first and then live events; appending
//! and broadcasting happen under one per-job lock, so no subscriber sees a
//! gap or a duplicate. Jobs expire a fixed time after creation.

mod registry;
mod stream;

pub use registry::{
    JobEvent, JobEventSink, JobRegistry, JobSnapshot, Subscription, DEFAULT_RETENTION,
};
pub use stream::{EventStream, StreamItem, KEEPALIVE_FRAME};
