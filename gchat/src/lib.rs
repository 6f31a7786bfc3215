//! Streaming turn orchestration over model providers.
//!
//! One turn mediates a single exchange between a client and a generative
//! model that may invoke external tools before answering: provider events
//! are multiplexed into buffered content and slot-accumulated tool calls,
//! tools run between generation rounds, and provider failures degrade
//! through a tool-less fallback cascade.

mod accumulator;
mod buffer;
mod controller;
mod error;
mod events;
mod hooks;
mod session;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        BufferPolicy, ChatError, ChatErrorKind, ChatEvent, CollectingSink, ContentBuffer,
        EventSink, FlushSignal, HistoryStore, NoHistory, NoopTurnHooks, Session, SessionRegistry,
        SinkClosed, ToolCallAccumulator, TurnEngine, TurnEngineBuilder, TurnHooks, TurnOutcome,
        TurnPolicy, TurnRequest,
    };
    pub use gcommon::{ConversationId, MetadataMap, SessionId, TraceId};
    pub use gtooling::{
        SequentialDispatcher, Tool, ToolDispatcher, ToolError, ToolErrorKind,
        ToolExecutionContext, ToolRegistry,
    };
}

pub use accumulator::ToolCallAccumulator;
pub use buffer::{BufferPolicy, ContentBuffer, FlushSignal};
pub use controller::{TurnEngine, TurnEngineBuilder};
pub use error::{ChatError, ChatErrorKind};
pub use events::{ChatEvent, CollectingSink, EventSink, SinkClosed, sse};
pub use hooks::{NoopTurnHooks, TurnHooks};
pub use session::{DEFAULT_SESSION_TTL, SessionRegistry};
pub use store::{ChatFuture, HistoryStore, NoHistory, truncate_preserving_system};
pub use types::{Session, TurnOutcome, TurnPolicy, TurnRequest, validate_continuation};
pub use gcommon::{ConversationId, MetadataMap, SessionId, TraceId};
