//! Turn-level errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    /// Provider call failed and the fallback cascade is exhausted.
    Provider,
    Tooling,
    /// A continuation invariant was violated; fatal to the turn.
    SessionState,
    /// The client transport disconnected; the turn aborts silently.
    Transport,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message)
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message)
    }

    pub fn session_state(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::SessionState, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Transport, message)
    }

    pub fn history(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::History, message)
    }

    /// Transport aborts emit no `error` event before the stream closes.
    pub fn is_silent(&self) -> bool {
        self.kind == ChatErrorKind::Transport
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<gprovider::ProviderError> for ChatError {
    fn from(value: gprovider::ProviderError) -> Self {
        ChatError::provider(value.to_string())
    }
}

impl From<gtooling::ToolError> for ChatError {
    fn from(value: gtooling::ToolError) -> Self {
        ChatError::tooling(value.to_string())
    }
}
