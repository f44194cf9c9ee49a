//! Core domain model types for planforge.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The closed set of pipeline step ids
//! - Step and job status enums
//! - Artifacts and pipeline events

mod artifact;
mod event;
mod status;
mod step_id;

pub use artifact::{into_artifact_set, Artifact, ArtifactMap, ArtifactSet};
pub use event::PipelineEvent;
pub use status::{JobStatus, StepStatus};
pub use step_id::{StepId, UnknownStepId};
