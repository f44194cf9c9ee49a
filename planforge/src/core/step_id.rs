//! The closed set of generation steps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of one pipeline step.
///
/// Variant order is the fixed execution order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// Requirements analysis (user stories, functional requirements).
    Requirements,
    /// System architecture.
    Architecture,
    /// Security review.
    Security,
    /// Infrastructure and deployment topology.
    Infrastructure,
    /// User interface design.
    Ui,
    /// Implementation plan.
    Implementation,
    /// Verification and test plan.
    Verification,
}

impl StepId {
    /// All steps in execution order.
    pub const ALL: [Self; 7] = [
        Self::Requirements,
        Self::Architecture,
        Self::Security,
        Self::Infrastructure,
        Self::Ui,
        Self::Implementation,
        Self::Verification,
    ];

    /// Returns the wire name of the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::Architecture => "architecture",
            Self::Security => "security",
            Self::Infrastructure => "infrastructure",
            Self::Ui => "ui",
            Self::Implementation => "implementation",
            Self::Verification => "verification",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unrecognised step name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown step: {0}")]
pub struct UnknownStepId(pub String);

impl FromStr for StepId {
    type Err = UnknownStepId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| UnknownStepId(s.to_string()))
    }
}
