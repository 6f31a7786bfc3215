//! Cross-turn conversation memory records.

use std::time::{Duration, SystemTime};

use gcommon::ConversationId;
use gprovider::Message;

pub const DEFAULT_HISTORY_CAP: usize = 20;
pub const DEFAULT_HISTORY_TTL: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub conversation_id: ConversationId,
    pub messages: Vec<Message>,
    pub updated_at: SystemTime,
}

impl HistoryEntry {
    pub fn new(conversation_id: ConversationId, messages: Vec<Message>) -> Self {
        Self {
            conversation_id,
            messages,
            updated_at: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPolicy {
    /// Messages retained per conversation, leading system message included.
    pub cap: usize,
    pub ttl: Duration,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            cap: DEFAULT_HISTORY_CAP,
            ttl: DEFAULT_HISTORY_TTL,
        }
    }
}

impl HistoryPolicy {
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap.max(1);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}
