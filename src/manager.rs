//! Agent manager: owns the set of live agents.
//!
//! The manager is the only shared mutable state between concurrently
//! running tests. Each test creates and removes exactly its own agent,
//! so the map only needs a lock around insert/remove, not per-agent
//! coordination.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::client::TaskBackend;
use crate::config::Config;
use crate::error::ManagerError;

/// Point-in-time view of the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerStats {
    /// Number of currently tracked agents.
    pub active_agents: usize,
    /// Whether the manager has been started.
    pub is_started: bool,
}

/// Owns agent creation, lookup and teardown behind a start/stop gate.
pub struct AgentManager {
    config: Arc<Config>,
    backend: Arc<dyn TaskBackend>,
    agents: Mutex<HashMap<String, Arc<Agent>>>,
    started: AtomicBool,
    name_counter: AtomicU64,
}

impl AgentManager {
    /// Creates a manager over the given backend. Nothing is validated
    /// until `start`.
    pub fn new(config: Arc<Config>, backend: Arc<dyn TaskBackend>) -> Self {
        Self {
            config,
            backend,
            agents: Mutex::new(HashMap::new()),
            started: AtomicBool::new(false),
            name_counter: AtomicU64::new(0),
        }
    }

    /// Starts the manager. Idempotent. Fails when the required remote
    /// credentials are absent.
    pub async fn start(&self) -> Result<(), ManagerError> {
        if self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        if !self.config.has_credentials() {
            return Err(ManagerError::MissingApiKey);
        }

        self.started.store(true, Ordering::SeqCst);
        info!("agent manager started");
        Ok(())
    }

    /// Stops the manager. Idempotent. Discards every tracked agent;
    /// no stop signal is sent to the remote service.
    pub async fn stop(&self) {
        if !self.started.load(Ordering::SeqCst) {
            return;
        }

        let mut agents = self.agents.lock().await;
        let dropped = agents.len();
        agents.clear();
        drop(agents);

        self.started.store(false, Ordering::SeqCst);
        info!(dropped, "agent manager stopped");
    }

    /// Creates and registers an agent for the given instruction.
    ///
    /// Auto-starts the manager when needed. Generates a name when none
    /// is given. A name collision removes the existing agent first; the
    /// new one takes its place.
    pub async fn create_agent(
        &self,
        instruction: &str,
        name: Option<&str>,
    ) -> Result<Arc<Agent>, ManagerError> {
        self.start().await?;

        let name = match name {
            Some(n) => n.to_string(),
            None => format!("agent-{}", self.name_counter.fetch_add(1, Ordering::SeqCst)),
        };

        let mut agents = self.agents.lock().await;
        if agents.remove(&name).is_some() {
            warn!(agent = %name, "agent already exists, removing old one");
        }

        let agent = Arc::new(Agent::new(
            name.clone(),
            instruction,
            Arc::clone(&self.backend),
            Arc::clone(&self.config),
        ));
        agents.insert(name.clone(), Arc::clone(&agent));
        info!(agent = %name, instruction = %instruction, "agent created");

        Ok(agent)
    }

    /// Looks up an agent by name.
    pub async fn get_agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.lock().await.get(name).cloned()
    }

    /// Removes an agent. Removing an unknown name is a no-op.
    pub async fn remove_agent(&self, name: &str) {
        if self.agents.lock().await.remove(name).is_some() {
            info!(agent = %name, "agent removed");
        }
    }

    /// Maps each tracked agent's name to its instruction.
    pub async fn list_agents(&self) -> HashMap<String, String> {
        let agents = self.agents.lock().await;
        let mut listing = HashMap::with_capacity(agents.len());
        for (name, agent) in agents.iter() {
            listing.insert(name.clone(), agent.instruction().await);
        }
        listing
    }

    /// Current manager statistics.
    pub async fn stats(&self) -> ManagerStats {
        ManagerStats {
            active_agents: self.agents.lock().await.len(),
            is_started: self.started.load(Ordering::SeqCst),
        }
    }
}
