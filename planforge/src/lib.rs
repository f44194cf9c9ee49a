//! # Planforge
//!
//! The generation pipeline substrate behind a planning assistant: a free-text
//! product request goes in, and a set of schema-validated planning artifacts
//! comes out, produced by a fixed sequence of generation steps.
//!
//! Planforge provides:
//!
//! - **Step sequencing**: a closed table of steps run in dependency order, fail-fast
//! - **Step execution**: per-step timeout, schema validation and classified retries
//! - **Jobs**: background runs with an append-only event log and replay-then-follow streams
//! - **Editing**: deterministic path-addressed edits of generated artifacts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use planforge::prelude::*;
//!
//! let service = PlanningService::new(Arc::new(my_generator), PlanforgeConfig::default())?;
//! let job_id = service.start_run("user-1", "diagram-1", "Build a todo app", RunOptions::new())?;
//!
//! let mut stream = service.stream_events(&job_id).expect("job exists");
//! while let Some(item) = stream.next().await {
//!     print!("{}", item.to_sse());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod contracts;
pub mod core;
pub mod edit;
pub mod errors;
pub mod events;
pub mod failure;
pub mod generation;
pub mod jobs;
pub mod observability;
pub mod pipeline;
pub mod service;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LogConfig, PlanforgeConfig};
    pub use crate::context::{AgentContext, RunOptions};
    pub use crate::contracts::{SchemaContract, ValidationError};
    pub use crate::core::{
        into_artifact_set, Artifact, ArtifactMap, ArtifactSet, JobStatus, PipelineEvent, StepId,
        StepStatus,
    };
    pub use crate::edit::{EditFailure, EditOp, EditResult};
    pub use crate::errors::{EditError, GenerationError, PipelineValidationError, PlanforgeError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::failure::{classify, FailureCategory, FailureClassification};
    pub use crate::generation::{GenerationRequest, Generator, ProgressCallback};
    pub use crate::jobs::{EventStream, JobRegistry, StreamItem};
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{
        PipelineReport, PipelineRunResult, PipelineSequencer, RetryPolicy, StepOutcome,
    };
    pub use crate::service::PlanningService;
    pub use crate::utils::{iso_timestamp, Timestamp};
}
