//! Degraded-model fallback cascade and its operational hook contracts.
//!
//! When a provider call fails, the cascade retries the operation against an
//! ordered list of degraded models, always without the tool manifest. The
//! first success reports the chosen model so the owning session can record
//! it; exhausting the list surfaces the original failure.

use std::future::Future;

use crate::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FallbackPlan {
    pub models: Vec<String>,
}

impl FallbackPlan {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.models.push(model.into());
        self
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct FallbackOutcome<T> {
    pub value: T,
    /// `Some(model)` when a degraded model produced the value.
    pub fallback_model: Option<String>,
}

impl<T> std::fmt::Debug for FallbackOutcome<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOutcome")
            .field("fallback_model", &self.fallback_model)
            .finish_non_exhaustive()
    }
}

pub trait FallbackHooks: Send + Sync {
    fn on_primary_failure(&self, _error: &ProviderError) {}

    fn on_fallback_attempt(&self, _model: &str, _position: usize) {}

    fn on_fallback_success(&self, _model: &str) {}

    fn on_fallback_exhausted(&self, _attempted: usize, _error: &ProviderError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFallbackHooks;

impl FallbackHooks for NoopFallbackHooks {}

/// Runs `execute(None)` as the primary attempt and cascades through the
/// plan's models on failure.
pub async fn execute_with_fallback<T, Op, OpFuture>(
    plan: &FallbackPlan,
    hooks: &dyn FallbackHooks,
    mut execute: Op,
) -> Result<FallbackOutcome<T>, ProviderError>
where
    Op: FnMut(Option<String>) -> OpFuture,
    OpFuture: Future<Output = Result<T, ProviderError>>,
{
    match execute(None).await {
        Ok(value) => Ok(FallbackOutcome {
            value,
            fallback_model: None,
        }),
        Err(primary_error) => {
            hooks.on_primary_failure(&primary_error);
            resume_with_fallback(plan, hooks, primary_error, |model| execute(Some(model))).await
        }
    }
}

/// Cascades through the plan's models for an operation whose primary attempt
/// already failed with `primary_error` (e.g. a stream that died mid-flight).
pub async fn resume_with_fallback<T, Op, OpFuture>(
    plan: &FallbackPlan,
    hooks: &dyn FallbackHooks,
    primary_error: ProviderError,
    mut execute: Op,
) -> Result<FallbackOutcome<T>, ProviderError>
where
    Op: FnMut(String) -> OpFuture,
    OpFuture: Future<Output = Result<T, ProviderError>>,
{
    for (position, model) in plan.models.iter().enumerate() {
        hooks.on_fallback_attempt(model, position + 1);

        if let Ok(value) = execute(model.clone()).await {
            hooks.on_fallback_success(model);
            return Ok(FallbackOutcome {
                value,
                fallback_model: Some(model.clone()),
            });
        }
    }

    hooks.on_fallback_exhausted(plan.models.len(), &primary_error);
    Err(primary_error)
}
