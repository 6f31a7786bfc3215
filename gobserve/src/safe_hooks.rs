use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use gchat::{ChatError, TurnHooks, TurnOutcome};
use gcommon::SessionId;
use gprovider::{FallbackHooks, ProviderError};
use gtooling::{ToolError, ToolExecutionContext, ToolRuntimeHooks};

pub struct SafeFallbackHooks<H> {
    inner: H,
}

impl<H> SafeFallbackHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> FallbackHooks for SafeFallbackHooks<H>
where
    H: FallbackHooks,
{
    fn on_primary_failure(&self, error: &ProviderError) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_primary_failure(error)));
    }

    fn on_fallback_attempt(&self, model: &str, position: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_fallback_attempt(model, position)
        }));
    }

    fn on_fallback_success(&self, model: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_fallback_success(model)));
    }

    fn on_fallback_exhausted(&self, attempted: usize, error: &ProviderError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_fallback_exhausted(attempted, error)
        }));
    }
}

pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_execution_start(&self, tool_call: &gprovider::ToolCall, context: &ToolExecutionContext) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_start(tool_call, context)
        }));
    }

    fn on_execution_success(
        &self,
        tool_call: &gprovider::ToolCall,
        context: &ToolExecutionContext,
        output: &str,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_execution_success(tool_call, context, output, elapsed)
        }));
    }

    fn on_execution_failure(
        &self,
        tool_call: &gprovider::ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_execution_failure(tool_call, context, error, elapsed)
        }));
    }
}

pub struct SafeTurnHooks<H> {
    inner: H,
}

impl<H> SafeTurnHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> TurnHooks for SafeTurnHooks<H>
where
    H: TurnHooks,
{
    fn on_turn_start(&self, session_id: &SessionId, model: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_start(session_id, model)
        }));
    }

    fn on_round_start(&self, session_id: &SessionId, round: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_round_start(session_id, round)
        }));
    }

    fn on_turn_complete(&self, session_id: &SessionId, outcome: &TurnOutcome, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_complete(session_id, outcome, elapsed)
        }));
    }

    fn on_turn_failed(&self, session_id: &SessionId, error: &ChatError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_failed(session_id, error, elapsed)
        }));
    }
}
