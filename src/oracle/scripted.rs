//! Scripted oracle for tests, benchmarks and dry runs.
//!
//! Answers come from prompt-matching rules first, then from a FIFO queue.
//! Rules exist because concurrent calls (one status call per player)
//! reach the oracle in no particular order; a rule keyed on the player id
//! answers the right call regardless of arrival order.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::{Oracle, OracleError, OracleRequest, OracleResponse};

type Scripted = Result<OracleResponse, OracleError>;

#[derive(Default)]
struct Script {
    rules: Vec<(String, Scripted)>,
    queue: VecDeque<Scripted>,
    requests: Vec<OracleRequest>,
}

/// An oracle that replays canned responses and records every request.
#[derive(Default)]
pub struct ScriptedOracle {
    script: Mutex<Script>,
}

impl std::fmt::Debug for ScriptedOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let script = self.lock();
        f.debug_struct("ScriptedOracle")
            .field("rules", &script.rules.len())
            .field("queued", &script.queue.len())
            .field("requests", &script.requests.len())
            .finish()
    }
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        // A panic while holding the lock leaves the script usable.
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues a raw text response.
    pub fn push_text(&self, text: impl Into<String>) -> &Self {
        self.lock().queue.push_back(Ok(OracleResponse::Text(text.into())));
        self
    }

    /// Queues a structured response.
    pub fn push_object(&self, value: Value) -> &Self {
        self.lock().queue.push_back(Ok(OracleResponse::Object(value)));
        self
    }

    /// Queues a failure.
    pub fn push_error(&self, error: OracleError) -> &Self {
        self.lock().queue.push_back(Err(error));
        self
    }

    /// Answers every prompt containing `needle` with `value`.
    pub fn on_prompt(&self, needle: impl Into<String>, value: Value) -> &Self {
        self.lock()
            .rules
            .push((needle.into(), Ok(OracleResponse::Object(value))));
        self
    }

    /// Fails every prompt containing `needle` with `error`.
    pub fn fail_on_prompt(&self, needle: impl Into<String>, error: OracleError) -> &Self {
        self.lock().rules.push((needle.into(), Err(error)));
        self
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.lock().requests.clone()
    }

    /// Prompts received so far, in arrival order.
    pub fn prompts(&self) -> Vec<String> {
        self.lock().requests.iter().map(|r| r.prompt.clone()).collect()
    }

    /// Number of queued responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().queue.len()
    }
}

impl Oracle for ScriptedOracle {
    fn generate(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        let mut script = self.lock();
        script.requests.push(request.clone());

        let matched = script
            .rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone());
        if let Some(response) = matched {
            return response;
        }

        script
            .queue
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Transport("script exhausted".to_string())))
    }
}
