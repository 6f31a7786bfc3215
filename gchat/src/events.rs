//! Client-facing event model, sink contract, and SSE encoding.
//!
//! A turn produces an ordered sequence of typed events over a persistent
//! text-event connection. Events are pushed through an [`EventSink`]; a
//! sink refusal means the client transport disconnected and the turn must
//! stop consuming without emitting anything further.

use std::sync::Mutex;

use gcommon::SessionId;
use gprovider::{ToolCall, ToolResult};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ChatEvent {
    SessionStarted {
        session_id: String,
    },
    Content {
        text: String,
        session_id: String,
    },
    ToolCallProgress {
        tool_call: ToolCall,
        session_id: String,
    },
    ToolCallsStarted {
        tool_calls: Vec<ToolCall>,
        session_id: String,
    },
    ToolCallsCompleted {
        results: Vec<ToolResult>,
        session_id: String,
    },
    StreamComplete {
        session_id: String,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

impl ChatEvent {
    pub fn session_started(session_id: &SessionId) -> Self {
        Self::SessionStarted {
            session_id: session_id.to_string(),
        }
    }

    pub fn content(text: impl Into<String>, session_id: &SessionId) -> Self {
        Self::Content {
            text: text.into(),
            session_id: session_id.to_string(),
        }
    }

    pub fn tool_call_progress(tool_call: ToolCall, session_id: &SessionId) -> Self {
        Self::ToolCallProgress {
            tool_call,
            session_id: session_id.to_string(),
        }
    }

    pub fn tool_calls_started(tool_calls: Vec<ToolCall>, session_id: &SessionId) -> Self {
        Self::ToolCallsStarted {
            tool_calls,
            session_id: session_id.to_string(),
        }
    }

    pub fn tool_calls_completed(results: Vec<ToolResult>, session_id: &SessionId) -> Self {
        Self::ToolCallsCompleted {
            results,
            session_id: session_id.to_string(),
        }
    }

    pub fn stream_complete(session_id: &SessionId) -> Self {
        Self::StreamComplete {
            session_id: session_id.to_string(),
        }
    }

    pub fn error(error: impl Into<String>, session_id: Option<&SessionId>) -> Self {
        Self::Error {
            error: error.into(),
            session_id: session_id.map(ToString::to_string),
        }
    }
}

/// Returned by a sink whose client transport has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ChatEvent) -> Result<(), SinkClosed>;
}

/// Sink that retains every event; the standard test double and a
/// convenient buffer for non-incremental callers.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ChatEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<ChatEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: ChatEvent) -> Result<(), SinkClosed> {
        self.events.lock().map_err(|_| SinkClosed)?.push(event);
        Ok(())
    }
}

pub mod sse {
    //! Line-delimited text-event framing for the client connection.
    //!
    //! ```rust
    //! use gchat::ChatEvent;
    //! use gcommon::SessionId;
    //!
    //! let frame = gchat::sse::to_frame(&ChatEvent::stream_complete(&SessionId::new("turn-1")))
    //!     .expect("event should encode");
    //! assert!(frame.starts_with("data: {"));
    //! assert!(frame.ends_with("\n\n"));
    //! ```

    use super::ChatEvent;
    use crate::ChatError;

    /// Legacy terminal sentinel some clients still expect after
    /// `stream_complete`.
    pub const DONE_FRAME: &str = "data: [DONE]\n\n";

    pub fn to_frame(event: &ChatEvent) -> Result<String, ChatError> {
        let body = serde_json::to_string(event)
            .map_err(|err| ChatError::invalid_request(format!("unencodable event: {err}")))?;
        Ok(format!("data: {body}\n\n"))
    }
}
