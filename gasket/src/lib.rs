//! Unified facade over the gasket workspace crates.
//!
//! This crate is designed to be the single dependency for most
//! applications. It re-exports the engine crates and provides convenience
//! utilities and macros for common setup and turn-building flows.

mod macros;

pub mod prelude;
pub mod runtime;
pub mod util;

#[cfg(feature = "provider-openai")]
pub mod providers;

pub use gchat;
pub use gcommon;
pub use gmemory;
pub use gobserve;
pub use gprovider;
pub use gtooling;

pub use gchat::{
    BufferPolicy, ChatError, ChatErrorKind, ChatEvent, ChatFuture, CollectingSink, ContentBuffer,
    EventSink, FlushSignal, HistoryStore, NoHistory, NoopTurnHooks, Session, SessionRegistry,
    SinkClosed, ToolCallAccumulator, TurnEngine, TurnEngineBuilder, TurnHooks, TurnOutcome,
    TurnPolicy, TurnRequest, sse, truncate_preserving_system, validate_continuation,
};
pub use gcommon::{BoxFuture, ConversationId, GenerationOptions, MetadataMap, SessionId, TraceId};
pub use gmemory::{
    DEFAULT_HISTORY_CAP, DEFAULT_HISTORY_TTL, DEFAULT_SWEEP_INTERVAL, HistoryEntry, HistoryPolicy,
    InMemoryHistory, spawn_ttl_sweeper,
};
pub use gobserve::{
    MetricsObservabilityHooks, SafeFallbackHooks, SafeToolHooks, SafeTurnHooks,
    TracingObservabilityHooks,
};
pub use gprovider::{
    BoxedEventStream, FallbackHooks, FallbackOutcome, FallbackPlan, Message, ModelEventStream,
    ModelProvider, ModelRequest, ModelRequestBuilder, NoopFallbackHooks, ProviderError,
    ProviderErrorKind, ProviderFuture, Role, StreamEvent, TerminalSignal, ToolCall,
    ToolCallFragment, ToolDefinition, ToolResult, VecEventStream, execute_with_fallback,
    resume_with_fallback,
};
pub use gtooling::{
    DEFAULT_TOOL_TIMEOUT, FunctionTool, NoopToolRuntimeHooks, SequentialDispatcher, Tool,
    ToolDispatcher, ToolError, ToolErrorKind, ToolExecutionContext, ToolExecutionResult,
    ToolFuture, ToolRegistry, ToolRuntimeHooks, error_envelope, fallback_results,
    parse_call_arguments, parse_json_value, required_string, unconfigured_results,
};

#[cfg(feature = "provider-openai")]
pub use gprovider::OpenAiCompatibleProvider;

pub use runtime::{
    RuntimeBundle, build_runtime, build_runtime_with, build_runtime_with_tooling,
    in_memory_history,
};
pub use util::{
    assistant_message, linked_turn, system_message, tool_message, turn, user_message,
};

#[cfg(feature = "provider-openai")]
pub use providers::{openai_compatible_provider, openai_provider};

#[cfg(test)]
mod tests {
    use crate::Role;

    #[test]
    fn gk_msg_macro_creates_expected_message() {
        let message = crate::gk_msg!(user => "hello");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.text(), "hello");
    }

    #[test]
    fn gk_messages_macro_builds_message_vector() {
        let messages = crate::gk_messages![
            system => "You are a vehicle diagnostics assistant.",
            user => "Read the stored codes.",
        ];

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn empty_gk_messages_macro_is_an_empty_vector() {
        let messages = crate::gk_messages![];
        assert!(messages.is_empty());
    }
}
