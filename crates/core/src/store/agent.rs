// crates/core/src/store/agent.rs
//! Cached list of specialist writing agents.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bookforge_client::BackendApi;
use tracing::{debug, warn};

#[derive(Default)]
struct AgentState {
    agents: Vec<String>,
    loading: bool,
    error: Option<String>,
}

struct AgentStoreInner {
    api: Arc<dyn BackendApi>,
    state: RwLock<AgentState>,
}

#[derive(Clone)]
pub struct AgentStore {
    inner: Arc<AgentStoreInner>,
}

impl AgentStore {
    pub fn new(api: Arc<dyn BackendApi>) -> Self {
        Self {
            inner: Arc::new(AgentStoreInner {
                api,
                state: RwLock::new(AgentState::default()),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AgentState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AgentState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load agent names once. Does nothing when names are cached and no load
    /// is in flight.
    pub async fn fetch_agent_names(&self) {
        {
            let mut state = self.write();
            if !state.agents.is_empty() && !state.loading {
                debug!(count = state.agents.len(), "agent names cached");
                return;
            }
            state.loading = true;
            state.error = None;
        }

        let result = self.inner.api.agent_names().await;

        let mut state = self.write();
        state.loading = false;
        match result {
            Ok(agents) => {
                debug!(count = agents.len(), "agent names loaded");
                state.agents = agents;
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch agent names");
                state.error = Some(format!("Failed to fetch agents: {e}"));
            }
        }
    }

    pub fn available_agents(&self) -> Vec<String> {
        self.read().agents.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }
}
