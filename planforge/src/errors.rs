//! Error types for the planforge pipeline substrate.
//!
//! Pipeline construction problems surface as [`PipelineValidationError`],
//! failures of the generation capability as [`GenerationError`], and
//! everything else as a [`PlanforgeError`] variant.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::failure::FailureCategory;

/// The main error type for planforge operations.
#[derive(Debug, Error)]
pub enum PlanforgeError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// The generation capability failed.
    #[error("{0}")]
    Generation(#[from] GenerationError),

    /// The requested job is not registered (never created, or evicted).
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// The job has already been started once.
    #[error("Job already started: {0}")]
    JobAlreadyStarted(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-004-ORDER").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a step table fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The steps involved in the error.
    pub steps: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            steps: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// An error thrown by the generation capability.
///
/// Unless `category` is set, the classifier only looks at `name` and
/// `message`, so both should carry whatever signal the underlying client
/// produced (e.g. `"TimeoutError"`, `"ECONNRESET"`, `"429 Too Many Requests"`).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct GenerationError {
    /// Error name, mirroring the kind of the underlying failure.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Category fixed at the point of failure; skips pattern matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FailureCategory>,
}

impl GenerationError {
    /// Creates a generation error with an explicit name.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            category: None,
        }
    }

    /// Pins the failure category.
    #[must_use]
    pub fn with_category(mut self, category: FailureCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Creates a generic error carrying only a message.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    /// A step exceeded its time budget.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new("TimeoutError", message)
    }

    /// A transport-level failure.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new("NetworkError", message)
    }

    /// The provider rejected the call due to rate limits or quota.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RateLimitError", message)
    }

    /// The returned value did not satisfy the schema contract.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("ValidationError", message)
    }

    /// A generic runtime fault inside the generation call.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new("ExecutionError", message)
    }
}

/// Errors produced while resolving or applying an edit operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The path string could not be parsed.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The target artifact does not exist.
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Nothing exists at the requested path.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// The container at a path segment does not match the segment kind.
    #[error("Type mismatch at '{segment}': expected {expected}, found {found}")]
    TypeMismatch {
        /// The segment being resolved.
        segment: String,
        /// The container kind the segment requires.
        expected: &'static str,
        /// The kind actually found.
        found: &'static str,
    },

    /// An array index is outside the array.
    #[error("Index out of bounds")]
    IndexOutOfBounds,

    /// Tried to remove from an empty array.
    #[error("Array is empty")]
    EmptyArray,
}
