//! Per-step execution context.
//!
//! An [`AgentContext`] is built fresh for each step from the artifacts of
//! every step that succeeded before it, and is read-only to the step.

mod agent;
mod options;

pub use agent::AgentContext;
pub use options::RunOptions;
