//! Precedence-ordered error classifier.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::errors::GenerationError;

/// The nature of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The call exceeded its time budget.
    Timeout,
    /// Connection refused/reset, DNS failure, generic fetch failure.
    Network,
    /// Explicit rate-limit or quota signal.
    RateLimit,
    /// Malformed or invalid input/output. Never retried.
    Validation,
    /// Generic runtime or internal fault.
    Execution,
    /// Nothing matched.
    Unknown,
}

impl FailureCategory {
    /// Categories in the order they are checked.
    pub const PRECEDENCE: [Self; 5] = [
        Self::Timeout,
        Self::Network,
        Self::RateLimit,
        Self::Validation,
        Self::Execution,
    ];

    /// Whether failures of this category may be retried.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::Validation)
    }

    /// Returns the wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::RateLimit => "rate_limit",
            Self::Validation => "validation",
            Self::Execution => "execution",
            Self::Unknown => "unknown",
        }
    }

    fn pattern(self) -> Option<&'static Regex> {
        static TIMEOUT: OnceLock<Option<Regex>> = OnceLock::new();
        static NETWORK: OnceLock<Option<Regex>> = OnceLock::new();
        static RATE_LIMIT: OnceLock<Option<Regex>> = OnceLock::new();
        static VALIDATION: OnceLock<Option<Regex>> = OnceLock::new();
        static EXECUTION: OnceLock<Option<Regex>> = OnceLock::new();

        let (cell, source) = match self {
            Self::Timeout => (&TIMEOUT, r"(?i)time[d\s_-]*out|etimedout|deadline exceeded|aborterror"),
            Self::Network => (
                &NETWORK,
                r"(?i)econnrefused|econnreset|enotfound|eai_again|connection (refused|reset|closed)|socket hang up|dns|fetch failed|network",
            ),
            Self::RateLimit => (
                &RATE_LIMIT,
                r"(?i)rate[\s_-]*limit|too many requests|\b429\b|quota|resource[\s_]exhausted",
            ),
            Self::Validation => (
                &VALIDATION,
                r"(?i)validation|invalid|malformed|schema|unexpected token|failed to parse|parse error",
            ),
            Self::Execution => (
                &EXECUTION,
                r"(?i)execution|internal|runtime|panicked|server error|\b50[0-4]\b",
            ),
            Self::Unknown => return None,
        };

        cell.get_or_init(|| Regex::new(source).ok()).as_ref()
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classifier's verdict on one error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureClassification {
    /// The category.
    pub category: FailureCategory,
    /// Whether the failure may be retried.
    pub is_retryable: bool,
}

impl From<FailureCategory> for FailureClassification {
    fn from(category: FailureCategory) -> Self {
        Self {
            category,
            is_retryable: category.is_retryable(),
        }
    }
}

/// Classifies a generation error.
///
/// A category pinned on the error wins; otherwise its name and message
/// are matched.
#[must_use]
pub fn classify(error: &GenerationError) -> FailureClassification {
    error
        .category
        .map_or_else(|| classify_parts(&error.name, &error.message), Into::into)
}

/// Classifies an error given its name and message.
///
/// Categories are checked in [`FailureCategory::PRECEDENCE`] order; the
/// first match wins. Unmatched errors are `unknown` and retryable.
#[must_use]
pub fn classify_parts(name: &str, message: &str) -> FailureClassification {
    let haystack = format!("{name}: {message}");

    let category = FailureCategory::PRECEDENCE
        .into_iter()
        .find(|category| {
            category
                .pattern()
                .is_some_and(|pattern| pattern.is_match(&haystack))
        })
        .unwrap_or(FailureCategory::Unknown);

    if category == FailureCategory::Unknown {
        tracing::warn!(
            error_name = %name,
            error = %message,
            "Unclassified failure, treating as retryable"
        );
    }

    category.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category_of(message: &str) -> FailureCategory {
        classify_parts("Error", message).category
    }

    #[test]
    fn test_patterns_compile() {
        for category in FailureCategory::PRECEDENCE {
            assert!(category.pattern().is_some(), "{category} pattern failed to compile");
        }
        assert!(FailureCategory::Unknown.pattern().is_none());
    }

    #[test]
    fn test_timeout_messages() {
        assert_eq!(category_of("Request timed out after 30000ms"), FailureCategory::Timeout);
        assert_eq!(category_of("ETIMEDOUT"), FailureCategory::Timeout);
        assert_eq!(
            classify(&GenerationError::timeout("step exceeded budget")).category,
            FailureCategory::Timeout
        );
    }

    #[test]
    fn test_network_messages() {
        assert_eq!(category_of("connect ECONNREFUSED 127.0.0.1:443"), FailureCategory::Network);
        assert_eq!(category_of("read ECONNRESET"), FailureCategory::Network);
        assert_eq!(category_of("getaddrinfo ENOTFOUND api.example.com"), FailureCategory::Network);
        assert_eq!(category_of("fetch failed"), FailureCategory::Network);
    }

    #[test]
    fn test_rate_limit_messages() {
        assert_eq!(category_of("429 Too Many Requests"), FailureCategory::RateLimit);
        assert_eq!(category_of("Rate limit reached for model"), FailureCategory::RateLimit);
        assert_eq!(category_of("You exceeded your current quota"), FailureCategory::RateLimit);
    }

    #[test]
    fn test_validation_is_not_retryable() {
        let verdict = classify_parts("Error", "Invalid response: missing field `components`");
        assert_eq!(verdict.category, FailureCategory::Validation);
        assert!(!verdict.is_retryable);

        let by_name = classify(&GenerationError::validation("output rejected"));
        assert_eq!(by_name.category, FailureCategory::Validation);
    }

    #[test]
    fn test_execution_messages() {
        assert_eq!(category_of("Internal server error"), FailureCategory::Execution);
        assert_eq!(category_of("upstream returned 503"), FailureCategory::Execution);
    }

    #[test]
    fn test_unknown_defaults_to_retryable() {
        let verdict = classify_parts("Error", "something odd happened");
        assert_eq!(verdict.category, FailureCategory::Unknown);
        assert!(verdict.is_retryable);
    }

    #[test]
    fn test_precedence_prefers_specific_categories() {
        // Both timeout and network signals: timeout is checked first.
        assert_eq!(category_of("network request timed out"), FailureCategory::Timeout);
        // Rate limit beats validation.
        assert_eq!(category_of("invalid request: rate limit exceeded"), FailureCategory::RateLimit);
        // Network beats execution.
        assert_eq!(category_of("internal error: ECONNRESET"), FailureCategory::Network);
    }

    #[test]
    fn test_pinned_category_skips_patterns() {
        let error = GenerationError::validation("Field 'network_policies': Required field is missing")
            .with_category(FailureCategory::Validation);
        let verdict = classify(&error);
        assert_eq!(verdict.category, FailureCategory::Validation);
        assert!(!verdict.is_retryable);

        let unpinned = GenerationError::validation("Field 'network_policies': Required field is missing");
        assert_eq!(classify(&unpinned).category, FailureCategory::Network);
    }

    #[test]
    fn test_name_contributes_to_classification() {
        let verdict = classify(&GenerationError::new("AbortError", "The operation was aborted"));
        assert_eq!(verdict.category, FailureCategory::Timeout);
    }
}
