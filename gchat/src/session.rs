//! Ephemeral per-turn session registry with TTL sweeping.
//!
//! Session ids are generated fresh per turn and never reused or shared, so
//! no two turns can hold exclusive access to the same id; the per-session
//! mutex covers the registry's own sweeps and reads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gcommon::{ConversationId, Registry, SessionId};
use serde_json::Value;

use crate::{ChatError, HistoryStore, Session};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_session_id() -> SessionId {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let sequence = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId::new(format!("turn-{millis}-{sequence}"))
}

pub struct SessionRegistry {
    sessions: Mutex<Registry<SessionId, Arc<Mutex<Session>>>>,
    ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(Registry::new()),
            ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn create(
        &self,
        context: Value,
        conversation_id: Option<ConversationId>,
    ) -> Arc<Mutex<Session>> {
        let session = Arc::new(Mutex::new(Session::new(
            next_session_id(),
            context,
            conversation_id,
        )));

        let id = session
            .lock()
            .map(|session| session.id.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().id.clone());

        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(id, Arc::clone(&session));
        }

        session
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        self.sessions
            .lock()
            .ok()
            .and_then(|sessions| sessions.get(id).cloned())
    }

    /// Removes the session, releases its stream handle, and folds it into
    /// history when a conversation id is linked.
    pub async fn close(
        &self,
        id: &SessionId,
        history: &dyn HistoryStore,
    ) -> Result<(), ChatError> {
        let Some(entry) = self.take(id) else {
            return Ok(());
        };

        let (conversation_id, messages) = {
            let mut session = entry
                .lock()
                .map_err(|_| ChatError::session_state("session lock poisoned"))?;
            session.stream_open = false;
            (session.conversation_id.clone(), session.messages.clone())
        };

        if let Some(conversation_id) = conversation_id {
            history.save(&conversation_id, messages).await?;
        }

        Ok(())
    }

    /// Removes the session without folding it into history. Used on turn
    /// failure, transport aborts, and TTL sweeps.
    pub fn discard(&self, id: &SessionId) -> bool {
        self.take(id).is_some()
    }

    /// Removes sessions created strictly longer than the TTL ago. An entry
    /// still borrowed by an in-flight turn is never swept.
    pub fn sweep_at(&self, now: SystemTime) -> usize {
        let Ok(mut sessions) = self.sessions.lock() else {
            return 0;
        };

        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, entry| {
            if Arc::strong_count(entry) > 1 {
                return true;
            }

            let Ok(session) = entry.lock() else {
                return false;
            };
            match now.duration_since(session.created_at) {
                Ok(age) => age <= ttl,
                // created_at in the future relative to `now`: keep
                Err(_) => true,
            }
        });

        before - sessions.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(SystemTime::now())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|sessions| sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        self.sessions
            .lock()
            .ok()
            .and_then(|mut sessions| sessions.remove(id))
    }
}
