//! Cross-turn history contract and shared transcript truncation.

use gcommon::{BoxFuture, ConversationId};
use gprovider::{Message, Role};

use crate::ChatError;

pub type ChatFuture<'a, T> = BoxFuture<'a, T>;

/// Longer-lived cross-turn memory, distinct from the ephemeral session.
///
/// Implementations apply their own cap and TTL policies; the engine only
/// loads at turn start (when a conversation id is supplied) and saves at
/// session close.
pub trait HistoryStore: Send + Sync {
    fn load<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Option<Vec<Message>>, ChatError>>;

    fn save<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        messages: Vec<Message>,
    ) -> ChatFuture<'a, Result<(), ChatError>>;
}

/// Store for turns without conversation linkage: loads nothing, saves
/// nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHistory;

impl HistoryStore for NoHistory {
    fn load<'a>(
        &'a self,
        _conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Option<Vec<Message>>, ChatError>> {
        Box::pin(async { Ok(None) })
    }

    fn save<'a>(
        &'a self,
        _conversation_id: &'a ConversationId,
        _messages: Vec<Message>,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Caps a transcript to its last `cap` messages, keeping a leading system
/// message in place across the cut.
pub fn truncate_preserving_system(messages: &mut Vec<Message>, cap: usize) {
    let cap = cap.max(1);
    if messages.len() <= cap {
        return;
    }

    if messages.first().map(|message| message.role) == Some(Role::System) {
        let tail_start = messages.len() - (cap - 1);
        messages.drain(1..tail_start);
    } else {
        let tail_start = messages.len() - cap;
        messages.drain(..tail_start);
    }
}
