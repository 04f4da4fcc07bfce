//! Agent registry: id -> oracle handle for one contest.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::ContestError;
use crate::oracle::Oracle;

/// Oracles available to a contest, by agent id.
///
/// Owned by the contest for its lifetime and passed explicitly; there is
/// no process-wide lookup.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Oracle>>,
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.agents.keys().collect();
        ids.sort();
        f.debug_struct("AgentRegistry").field("agents", &ids).finish()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `oracle` under `id`, replacing any previous entry.
    pub fn register(&mut self, id: impl Into<String>, oracle: impl Oracle + 'static) -> &mut Self {
        self.agents.insert(id.into(), Arc::new(oracle));
        self
    }

    /// Registers an already shared oracle, e.g. one handle serving several roles.
    pub fn register_shared(&mut self, id: impl Into<String>, oracle: Arc<dyn Oracle>) -> &mut Self {
        self.agents.insert(id.into(), oracle);
        self
    }

    /// Looks up the oracle for `id`.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Oracle>, ContestError> {
        self.agents
            .get(id)
            .cloned()
            .ok_or_else(|| ContestError::UnknownAgent(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
