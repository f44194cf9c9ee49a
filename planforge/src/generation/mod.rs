//! The generation capability consumed by the pipeline.
//!
//! The pipeline treats "call the model and get back a value conforming to
//! a schema" as a black box. Implementations raise [`GenerationError`]s,
//! which are the sole input to the failure classifier.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;

use crate::contracts::SchemaContract;
use crate::core::StepId;
pub use crate::errors::GenerationError;

/// Receives partial content while a generation call is in flight.
pub type ProgressCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// One call to the generation capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The step being generated.
    pub step: StepId,
    /// The agent role for the step.
    pub role: String,
    /// Fully rendered prompt.
    pub prompt: String,
    /// Contract the final value must satisfy.
    pub contract: SchemaContract,
}

/// A source of step content, typically backed by a language model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generates a complete value for `request`.
    ///
    /// `progress`, when present, may be invoked any number of times with
    /// partial payloads before the call returns.
    async fn generate(
        &self,
        request: GenerationRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<Value, GenerationError>;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Arc<G> {
    async fn generate(
        &self,
        request: GenerationRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<Value, GenerationError> {
        (**self).generate(request, progress).await
    }
}

/// A generator backed by an async closure.
pub struct FnGenerator<F> {
    func: F,
}

impl<F, Fut> FnGenerator<F>
where
    F: Fn(GenerationRequest, Option<ProgressCallback>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, GenerationError>> + Send,
{
    /// Wraps `func` as a generator.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnGenerator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnGenerator").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Generator for FnGenerator<F>
where
    F: Fn(GenerationRequest, Option<ProgressCallback>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, GenerationError>> + Send,
{
    async fn generate(
        &self,
        request: GenerationRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<Value, GenerationError> {
        (self.func)(request, progress).await
    }
}
