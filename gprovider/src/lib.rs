//! Provider contracts and fallback plumbing for the gasket engine.
//!
//! The engine consumes generation backends through [`ModelProvider`]: one
//! streaming submission per call, yielding interleaved content and
//! slot-indexed tool-call fragments until a terminal signal. Provider
//! failures are degraded through the [`FallbackPlan`] cascade rather than
//! surfaced directly.

mod adapters;
mod error;
mod fallback;
mod model;
mod provider;
mod stream;

pub mod prelude {
    pub use crate::{
        BoxedEventStream, FallbackHooks, FallbackOutcome, FallbackPlan, Message, ModelEventStream,
        ModelProvider, ModelRequest, ModelRequestBuilder, NoopFallbackHooks, ProviderError,
        ProviderErrorKind, ProviderFuture, Role, StreamEvent, TerminalSignal, ToolCall,
        ToolCallFragment, ToolDefinition, ToolResult, VecEventStream, execute_with_fallback,
        resume_with_fallback,
    };
}

#[cfg(feature = "provider-openai")]
pub use adapters::OpenAiCompatibleProvider;
pub use error::{ProviderError, ProviderErrorKind};
pub use fallback::{
    FallbackHooks, FallbackOutcome, FallbackPlan, NoopFallbackHooks, execute_with_fallback,
    resume_with_fallback,
};
pub use model::{
    Message, ModelRequest, ModelRequestBuilder, Role, ToolCall, ToolDefinition, ToolResult,
};
pub use provider::{ModelProvider, ProviderFuture};
pub use stream::{
    BoxedEventStream, ModelEventStream, StreamEvent, TerminalSignal, ToolCallFragment,
    VecEventStream,
};
