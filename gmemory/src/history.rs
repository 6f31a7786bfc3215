//! In-memory conversation history backend with cap and TTL enforcement.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

use gchat::{ChatError, ChatFuture, HistoryStore, truncate_preserving_system};
use gcommon::ConversationId;
use gprovider::Message;

use crate::{HistoryEntry, HistoryPolicy};

#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: Mutex<HashMap<ConversationId, HistoryEntry>>,
    policy: HistoryPolicy,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: HistoryPolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &HistoryPolicy {
        &self.policy
    }

    pub fn get(&self, conversation_id: &ConversationId) -> Option<HistoryEntry> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(conversation_id).cloned())
    }

    /// Removes entries whose last touch is strictly older than the TTL.
    pub fn sweep_at(&self, now: SystemTime) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };

        let before = entries.len();
        let ttl = self.policy.ttl;
        entries.retain(|_, entry| match now.duration_since(entry.updated_at) {
            Ok(age) => age <= ttl,
            Err(_) => true,
        });

        before - entries.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(SystemTime::now())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryStore for InMemoryHistory {
    fn load<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Option<Vec<Message>>, ChatError>> {
        Box::pin(async move {
            let entries = self
                .entries
                .lock()
                .map_err(|_| ChatError::history("history store lock poisoned"))?;

            Ok(entries
                .get(conversation_id)
                .map(|entry| entry.messages.clone()))
        })
    }

    fn save<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        mut messages: Vec<Message>,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            truncate_preserving_system(&mut messages, self.policy.cap);

            let mut entries = self
                .entries
                .lock()
                .map_err(|_| ChatError::history("history store lock poisoned"))?;

            entries.insert(
                conversation_id.clone(),
                HistoryEntry::new(conversation_id.clone(), messages),
            );

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gprovider::Role;

    use super::*;

    fn conversation(messages: usize, with_system: bool) -> Vec<Message> {
        let mut transcript = Vec::new();
        if with_system {
            transcript.push(Message::system("diagnostics assistant"));
        }
        for index in 0..messages {
            transcript.push(Message::user(format!("m{index}")));
        }
        transcript
    }

    #[tokio::test]
    async fn save_caps_to_last_twenty_preserving_system() {
        let history = InMemoryHistory::new();
        let conversation_id = ConversationId::new("garage-1");

        // 1 system + 24 user messages accumulated across a turn
        history
            .save(&conversation_id, conversation(24, true))
            .await
            .expect("save should succeed");

        let loaded = history
            .load(&conversation_id)
            .await
            .expect("load should succeed")
            .expect("entry should exist");

        assert_eq!(loaded.len(), 20);
        assert_eq!(loaded[0].role, Role::System);
        assert_eq!(loaded[1].text(), "m5");
        assert_eq!(loaded[19].text(), "m23");
    }

    #[tokio::test]
    async fn save_replaces_the_prior_entry_and_touches_it() {
        let history = InMemoryHistory::new();
        let conversation_id = ConversationId::new("garage-2");

        history
            .save(&conversation_id, conversation(2, false))
            .await
            .expect("first save");
        let first_touch = history
            .get(&conversation_id)
            .expect("entry should exist")
            .updated_at;

        history
            .save(&conversation_id, conversation(3, false))
            .await
            .expect("second save");
        let entry = history.get(&conversation_id).expect("entry should exist");

        assert_eq!(entry.messages.len(), 3);
        assert!(entry.updated_at >= first_touch);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn unknown_conversations_load_as_absent() {
        let history = InMemoryHistory::new();
        let loaded = history
            .load(&ConversationId::new("nobody"))
            .await
            .expect("load should succeed");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn sweep_honors_ttl_boundaries() {
        let history =
            InMemoryHistory::with_policy(HistoryPolicy::default().with_ttl(Duration::from_secs(60)));
        let conversation_id = ConversationId::new("garage-3");

        history
            .save(&conversation_id, conversation(1, false))
            .await
            .expect("save should succeed");
        let touched = history
            .get(&conversation_id)
            .expect("entry should exist")
            .updated_at;

        assert_eq!(history.sweep_at(touched + Duration::from_secs(59)), 0);
        assert_eq!(history.sweep_at(touched + Duration::from_secs(60)), 0);
        assert_eq!(history.sweep_at(touched + Duration::from_secs(61)), 1);
        assert!(history.is_empty());
    }
}
