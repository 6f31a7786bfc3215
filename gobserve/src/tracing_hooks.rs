//! Tracing-based observability hooks for turn, fallback, and tool phases.
//!
//! ```rust
//! use gobserve::TracingObservabilityHooks;
//! use gchat::TurnHooks;
//!
//! fn accepts_turn_hooks(_hooks: &dyn TurnHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_turn_hooks(&hooks);
//! ```

use std::time::Duration;

use gchat::{ChatError, TurnHooks, TurnOutcome};
use gcommon::SessionId;
use gprovider::{FallbackHooks, ProviderError};
use gtooling::{ToolError, ToolExecutionContext, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl FallbackHooks for TracingObservabilityHooks {
    fn on_primary_failure(&self, error: &ProviderError) {
        tracing::warn!(
            phase = "fallback",
            event = "primary_failure",
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_fallback_attempt(&self, model: &str, position: usize) {
        tracing::info!(
            phase = "fallback",
            event = "attempt",
            model,
            position
        );
    }

    fn on_fallback_success(&self, model: &str) {
        tracing::info!(phase = "fallback", event = "success", model);
    }

    fn on_fallback_exhausted(&self, attempted: usize, error: &ProviderError) {
        tracing::error!(
            phase = "fallback",
            event = "exhausted",
            attempted,
            error_kind = ?error.kind,
            error = %error
        );
    }
}

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_execution_start(&self, tool_call: &gprovider::ToolCall, context: &ToolExecutionContext) {
        tracing::info!(
            phase = "tool",
            event = "execution_start",
            tool_name = tool_call.name,
            tool_call_id = tool_call.id,
            session_id = %context.session_id,
            trace_id = context.trace_id.as_ref().map(|id| id.as_str())
        );
    }

    fn on_execution_success(
        &self,
        tool_call: &gprovider::ToolCall,
        context: &ToolExecutionContext,
        _output: &str,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "tool",
            event = "execution_success",
            tool_name = tool_call.name,
            tool_call_id = tool_call.id,
            session_id = %context.session_id,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_execution_failure(
        &self,
        tool_call: &gprovider::ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "tool",
            event = "execution_failure",
            tool_name = tool_call.name,
            tool_call_id = tool_call.id,
            session_id = %context.session_id,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl TurnHooks for TracingObservabilityHooks {
    fn on_turn_start(&self, session_id: &SessionId, model: &str) {
        tracing::info!(
            phase = "turn",
            event = "start",
            session_id = %session_id,
            model
        );
    }

    fn on_round_start(&self, session_id: &SessionId, round: usize) {
        tracing::debug!(
            phase = "turn",
            event = "round_start",
            session_id = %session_id,
            round
        );
    }

    fn on_turn_complete(&self, session_id: &SessionId, outcome: &TurnOutcome, elapsed: Duration) {
        tracing::info!(
            phase = "turn",
            event = "complete",
            session_id = %session_id,
            rounds = outcome.rounds,
            degraded = outcome.fallback_model.is_some(),
            round_limit_reached = outcome.round_limit_reached,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_turn_failed(&self, session_id: &SessionId, error: &ChatError, elapsed: Duration) {
        tracing::error!(
            phase = "turn",
            event = "failed",
            session_id = %session_id,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }
}
