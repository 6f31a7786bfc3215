//! Sequential tool-call dispatcher with error-envelope results.
//!
//! Tool failures never abort a turn: every declared call produces exactly
//! one result, in declaration order, and failures are serialized into a
//! structured error envelope the model can read on continuation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_timer::Delay;
use futures_util::future::{self, Either};
use gprovider::{ToolCall, ToolResult};
use serde_json::{Value, json};

use crate::{
    NoopToolRuntimeHooks, ToolError, ToolExecutionContext, ToolFuture, ToolRegistry,
    ToolRuntimeHooks, parse_call_arguments,
};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

pub trait ToolDispatcher: Send + Sync {
    /// One result per input call, in input order.
    fn dispatch<'a>(
        &'a self,
        tool_calls: &'a [ToolCall],
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Vec<ToolResult>>;
}

/// Serialized envelope for a call that could not produce a real result.
pub fn error_envelope(tool_name: &str, message: &str) -> String {
    json!({
        "error": true,
        "message": message,
        "tool": tool_name,
    })
    .to_string()
}

/// Placeholder results for a session in fallback mode, where tool
/// processing is skipped entirely.
pub fn fallback_results(tool_calls: &[ToolCall]) -> Vec<ToolResult> {
    let placeholder = json!({
        "message": "tool processing unavailable",
        "status": "fallback",
    })
    .to_string();

    tool_calls
        .iter()
        .map(|call| ToolResult::new(call.id.clone(), placeholder.clone()))
        .collect()
}

/// Envelope results for an engine that has no tool runtime configured.
pub fn unconfigured_results(tool_calls: &[ToolCall]) -> Vec<ToolResult> {
    tool_calls
        .iter()
        .map(|call| {
            ToolResult::new(
                call.id.clone(),
                error_envelope(&call.name, "tool runtime is not configured"),
            )
        })
        .collect()
}

#[derive(Clone)]
pub struct SequentialDispatcher {
    registry: Arc<ToolRegistry>,
    hooks: Arc<dyn ToolRuntimeHooks>,
    call_timeout: Option<Duration>,
}

impl SequentialDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            hooks: Arc::new(NoopToolRuntimeHooks),
            call_timeout: Some(DEFAULT_TOOL_TIMEOUT),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    async fn execute_call(&self, call: &ToolCall, context: &ToolExecutionContext) -> ToolResult {
        let started = Instant::now();
        self.hooks.on_execution_start(call, context);

        match self.try_call(call, context).await {
            Ok(output) => {
                self.hooks
                    .on_execution_success(call, context, &output, started.elapsed());
                ToolResult::new(call.id.clone(), output)
            }
            Err(error) => {
                self.hooks
                    .on_execution_failure(call, context, &error, started.elapsed());
                ToolResult::new(call.id.clone(), error_envelope(&call.name, &error.message))
            }
        }
    }

    async fn try_call(
        &self,
        call: &ToolCall,
        context: &ToolExecutionContext,
    ) -> Result<String, ToolError> {
        let tool = self.registry.get(&call.name).ok_or_else(|| {
            ToolError::not_found(format!("tool '{}' is not registered", call.name))
                .with_tool_name(call.name.clone())
                .with_tool_call_id(call.id.clone())
        })?;

        let args = parse_call_arguments(&call.arguments).map_err(|error| {
            error
                .with_tool_name(call.name.clone())
                .with_tool_call_id(call.id.clone())
        })?;
        let args_json = Value::Object(args).to_string();

        let invoke = tool.invoke(&args_json, context);
        match self.call_timeout {
            None => invoke.await,
            Some(limit) => match future::select(invoke, Delay::new(limit)).await {
                Either::Left((result, _)) => result,
                Either::Right(((), _)) => Err(ToolError::timeout(format!(
                    "tool '{}' did not finish within {}ms",
                    call.name,
                    limit.as_millis()
                ))
                .with_tool_name(call.name.clone())
                .with_tool_call_id(call.id.clone())),
            },
        }
    }
}

impl ToolDispatcher for SequentialDispatcher {
    fn dispatch<'a>(
        &'a self,
        tool_calls: &'a [ToolCall],
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Vec<ToolResult>> {
        Box::pin(async move {
            let mut results = Vec::with_capacity(tool_calls.len());
            for call in tool_calls {
                results.push(self.execute_call(call, context).await);
            }
            results
        })
    }
}
