//! Capability layer for registering and executing tools.

mod args;
mod dispatcher;
mod error;
mod hooks;
mod registry;
mod tool;
mod types;

pub mod prelude {
    pub use crate::{
        DEFAULT_TOOL_TIMEOUT, FunctionTool, NoopToolRuntimeHooks, SequentialDispatcher, Tool,
        ToolDispatcher, ToolError, ToolErrorKind, ToolExecutionContext, ToolExecutionResult,
        ToolFuture, ToolRegistry, ToolRuntimeHooks, error_envelope, fallback_results,
        parse_call_arguments, unconfigured_results,
    };
}

pub use args::{optional_u64, parse_call_arguments, parse_json_value, required_string};
pub use dispatcher::{
    DEFAULT_TOOL_TIMEOUT, SequentialDispatcher, ToolDispatcher, error_envelope, fallback_results,
    unconfigured_results,
};
pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolRuntimeHooks};
pub use registry::ToolRegistry;
pub use tool::{FunctionTool, Tool, ToolFuture};
pub use types::{ToolExecutionContext, ToolExecutionResult};
