//! Session, turn request/outcome, and engine policy types.

use std::collections::HashSet;
use std::time::SystemTime;

use gcommon::{ConversationId, GenerationOptions, SessionId};
use gprovider::{Message, Role};
use serde_json::Value;

use crate::{BufferPolicy, ChatError};

/// Ephemeral per-turn state, created at turn start and destroyed at a
/// terminal state or by TTL sweep. Mutated only by the turn that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub messages: Vec<Message>,
    /// Opaque vehicle/customer blob, passed through to tools untouched.
    pub context: Value,
    pub created_at: SystemTime,
    pub stream_open: bool,
    /// `Some(model)` once the turn has degraded; sticky for the remainder
    /// of the turn, and tool use is never retried after it is set.
    pub fallback_model: Option<String>,
    pub conversation_id: Option<ConversationId>,
}

impl Session {
    pub fn new(id: SessionId, context: Value, conversation_id: Option<ConversationId>) -> Self {
        Self {
            id,
            messages: Vec::new(),
            context,
            created_at: SystemTime::now(),
            stream_open: false,
            fallback_model: None,
            conversation_id,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_model.is_some()
    }
}

/// A session is invalid for continuation until every tool call announced by
/// its most recent assistant message has a matching tool-result message.
pub fn validate_continuation(messages: &[Message]) -> Result<(), ChatError> {
    let Some(assistant_index) = messages
        .iter()
        .rposition(|message| message.role == Role::Assistant && !message.tool_calls.is_empty())
    else {
        return Ok(());
    };

    let answered: HashSet<&str> = messages[assistant_index + 1..]
        .iter()
        .filter(|message| message.role == Role::Tool)
        .filter_map(|message| message.tool_call_id.as_deref())
        .collect();

    for call in &messages[assistant_index].tool_calls {
        if !answered.contains(call.id.as_str()) {
            return Err(ChatError::session_state(format!(
                "tool call '{}' has no matching tool result",
                call.id
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub model: String,
    pub user_input: String,
    pub system_prompt: Option<String>,
    pub context: Value,
    pub conversation_id: Option<ConversationId>,
    pub options: GenerationOptions,
}

impl TurnRequest {
    pub fn new(model: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            user_input: user_input.into(),
            system_prompt: None,
            context: Value::Null,
            conversation_id: None,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<ConversationId>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnPolicy {
    /// Tool round-trips allowed before the turn is ended gracefully.
    pub max_tool_rounds: usize,
    /// Session message-list cap applied after each tool round.
    pub history_cap: usize,
    pub buffer: BufferPolicy,
}

impl Default for TurnPolicy {
    fn default() -> Self {
        Self {
            max_tool_rounds: 6,
            history_cap: 20,
            buffer: BufferPolicy::default(),
        }
    }
}

impl TurnPolicy {
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds.max(1);
        self
    }

    pub fn with_history_cap(mut self, history_cap: usize) -> Self {
        self.history_cap = history_cap.max(1);
        self
    }

    pub fn with_buffer(mut self, buffer: BufferPolicy) -> Self {
        self.buffer = buffer;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub session_id: SessionId,
    pub assistant_message: Option<String>,
    pub rounds: usize,
    pub fallback_model: Option<String>,
    pub round_limit_reached: bool,
}
