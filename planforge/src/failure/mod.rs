//! Failure classification.
//!
//! Maps errors raised by the generation capability onto a small set of
//! categories that decide whether a retry is worthwhile.

mod classifier;

pub use classifier::{classify, classify_parts, FailureCategory, FailureClassification};
