//! Contest orchestration.
//!
//! A contest owns its configuration, an agent registry snapshot and the
//! round history. `Contest` drives the setup, collect and judge phases;
//! `write_history_jsonl` exports the result.

pub mod config;
pub mod history;
pub mod machine;
pub mod registry;

use thiserror::Error;

use crate::grid::GridError;
use crate::oracle::OracleError;

pub use config::ContestConfig;
pub use history::{write_history_jsonl, write_round_json};
pub use machine::{Contest, ContestState};
pub use registry::AgentRegistry;

/// Errors from configuring or running a contest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContestError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("invalid contest config: {0}")]
    InvalidConfig(String),

    #[error("cannot {operation} while {state}")]
    InvalidTransition { operation: &'static str, state: ContestState },
}
