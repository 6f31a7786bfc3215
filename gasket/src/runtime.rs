//! Runtime wiring helpers for engine usage.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    FallbackPlan, InMemoryHistory, ModelProvider, SessionRegistry, ToolRegistry, TurnEngine,
    TurnPolicy, spawn_ttl_sweeper,
};

#[derive(Clone)]
pub struct RuntimeBundle {
    pub sessions: Arc<SessionRegistry>,
    pub history: Arc<InMemoryHistory>,
    pub engine: TurnEngine,
}

impl RuntimeBundle {
    /// Starts the periodic TTL sweeper over this bundle's registries.
    pub fn start_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        spawn_ttl_sweeper(Arc::clone(&self.sessions), Arc::clone(&self.history), interval)
    }
}

pub fn in_memory_history() -> Arc<InMemoryHistory> {
    Arc::new(InMemoryHistory::new())
}

pub fn build_runtime(provider: Arc<dyn ModelProvider>) -> RuntimeBundle {
    build_runtime_with(provider, None, FallbackPlan::default(), TurnPolicy::default())
}

pub fn build_runtime_with_tooling(
    provider: Arc<dyn ModelProvider>,
    tool_registry: Arc<ToolRegistry>,
) -> RuntimeBundle {
    build_runtime_with(
        provider,
        Some(tool_registry),
        FallbackPlan::default(),
        TurnPolicy::default(),
    )
}

pub fn build_runtime_with(
    provider: Arc<dyn ModelProvider>,
    tool_registry: Option<Arc<ToolRegistry>>,
    fallback: FallbackPlan,
    policy: TurnPolicy,
) -> RuntimeBundle {
    let sessions = Arc::new(SessionRegistry::new());
    let history = in_memory_history();

    let mut builder = TurnEngine::builder(provider)
        .sessions(Arc::clone(&sessions))
        .history(history.clone())
        .fallback(fallback)
        .policy(policy);

    if let Some(tool_registry) = tool_registry {
        builder = builder.tool_registry(tool_registry);
    }

    RuntimeBundle {
        sessions,
        history,
        engine: builder.build(),
    }
}
