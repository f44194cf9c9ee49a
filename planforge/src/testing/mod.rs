//! Testing utilities for planforge pipelines.
//!
//! This module provides:
//! - A scripted generator with per-step results and call recording
//! - Content fixtures that satisfy each step's contract
//! - Assertions over collected events

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_event_types, assert_step_status};
pub use fixtures::{sample_artifact, sample_artifacts, sample_content};
pub use mocks::ScriptedGenerator;
