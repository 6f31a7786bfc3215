//! Periodic TTL sweeping for sessions and conversation history.

use std::sync::Arc;
use std::time::Duration;

use gchat::SessionRegistry;
use tokio::task::JoinHandle;

use crate::InMemoryHistory;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Runs both TTL sweeps on one independent periodic timer. Sessions held by
/// in-flight turns are skipped by the registry itself; abort the returned
/// handle on shutdown.
pub fn spawn_ttl_sweeper(
    sessions: Arc<SessionRegistry>,
    history: Arc<InMemoryHistory>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick fires immediately; skip it so a sweep never races
        // session creation at startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sessions.sweep();
            history.sweep();
        }
    })
}
