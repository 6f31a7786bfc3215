//! Cross-turn conversation memory for the gasket engine.
//!
//! The history backend is deliberately ephemeral: a capped, TTL-swept
//! in-memory map keyed by conversation id. Durable transcript storage is an
//! external collaborator and lives outside the engine.

mod history;
mod sweeper;
mod types;

pub mod prelude {
    pub use crate::{
        DEFAULT_HISTORY_CAP, DEFAULT_HISTORY_TTL, DEFAULT_SWEEP_INTERVAL, HistoryEntry,
        HistoryPolicy, InMemoryHistory, spawn_ttl_sweeper,
    };
}

pub use history::InMemoryHistory;
pub use sweeper::{DEFAULT_SWEEP_INTERVAL, spawn_ttl_sweeper};
pub use types::{DEFAULT_HISTORY_CAP, DEFAULT_HISTORY_TTL, HistoryEntry, HistoryPolicy};
