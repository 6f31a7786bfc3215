//! Metrics-based observability hooks for turn, fallback, and tool phases.
//!
//! ```rust
//! use gobserve::MetricsObservabilityHooks;
//! use gprovider::FallbackHooks;
//!
//! fn accepts_fallback_hooks(_hooks: &dyn FallbackHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_fallback_hooks(&hooks);
//! ```

use std::time::Duration;

use gchat::{ChatError, TurnHooks, TurnOutcome};
use gcommon::SessionId;
use gprovider::{FallbackHooks, ProviderError};
use gtooling::{ToolError, ToolExecutionContext, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl FallbackHooks for MetricsObservabilityHooks {
    fn on_primary_failure(&self, error: &ProviderError) {
        metrics::counter!(
            "gasket_fallback_primary_failure_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }

    fn on_fallback_attempt(&self, model: &str, _position: usize) {
        metrics::counter!(
            "gasket_fallback_attempt_total",
            "model" => model.to_string()
        )
        .increment(1);
    }

    fn on_fallback_success(&self, model: &str) {
        metrics::counter!(
            "gasket_fallback_success_total",
            "model" => model.to_string()
        )
        .increment(1);
    }

    fn on_fallback_exhausted(&self, attempted: usize, error: &ProviderError) {
        metrics::counter!(
            "gasket_fallback_exhausted_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("gasket_fallback_attempts_per_exhaustion").record(attempted as f64);
    }
}

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_execution_start(&self, tool_call: &gprovider::ToolCall, _context: &ToolExecutionContext) {
        metrics::counter!(
            "gasket_tool_execution_start_total",
            "tool" => tool_call.name.clone()
        )
        .increment(1);
    }

    fn on_execution_success(
        &self,
        tool_call: &gprovider::ToolCall,
        _context: &ToolExecutionContext,
        _output: &str,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "gasket_tool_execution_success_total",
            "tool" => tool_call.name.clone()
        )
        .increment(1);
        metrics::histogram!(
            "gasket_tool_execution_seconds",
            "tool" => tool_call.name.clone()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_execution_failure(
        &self,
        tool_call: &gprovider::ToolCall,
        _context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "gasket_tool_execution_failure_total",
            "tool" => tool_call.name.clone(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "gasket_tool_execution_seconds",
            "tool" => tool_call.name.clone()
        )
        .record(elapsed.as_secs_f64());
    }
}

impl TurnHooks for MetricsObservabilityHooks {
    fn on_turn_start(&self, _session_id: &SessionId, model: &str) {
        metrics::counter!(
            "gasket_turn_start_total",
            "model" => model.to_string()
        )
        .increment(1);
    }

    fn on_round_start(&self, _session_id: &SessionId, _round: usize) {
        metrics::counter!("gasket_turn_round_total").increment(1);
    }

    fn on_turn_complete(&self, _session_id: &SessionId, outcome: &TurnOutcome, elapsed: Duration) {
        metrics::counter!(
            "gasket_turn_complete_total",
            "degraded" => outcome.fallback_model.is_some().to_string()
        )
        .increment(1);
        metrics::histogram!("gasket_turn_seconds").record(elapsed.as_secs_f64());
        metrics::histogram!("gasket_turn_rounds").record(outcome.rounds as f64);
    }

    fn on_turn_failed(&self, _session_id: &SessionId, error: &ChatError, elapsed: Duration) {
        metrics::counter!(
            "gasket_turn_failed_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("gasket_turn_seconds").record(elapsed.as_secs_f64());
    }
}
