//! Per-round data model.
//!
//! Wire forms are camelCase JSON, which is also what oracles see when a
//! round is embedded in a prompt.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::{Point, Positions};

/// Health a player starts the contest with.
pub const STARTING_HEALTH: f64 = 100.0;

/// Status label a player starts the contest with.
pub const STARTING_STATUS: &str = "fresh";

/// A player's condition. Replaced wholesale each round, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub status: String,
    pub health: f64,
    pub inventory: Vec<String>,
}

impl PlayerStatus {
    /// The status every player enters the contest with.
    pub fn fresh() -> Self {
        PlayerStatus {
            status: STARTING_STATUS.to_string(),
            health: STARTING_HEALTH,
            inventory: Vec::new(),
        }
    }
}

/// What a player chose to do this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAction {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Point>,
    pub narration: String,
}

/// The judge's verdict for one player. Free text by nature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeResult {
    pub player_id: String,
    pub result: String,
    pub reason: String,
}

/// A verdict together with the status it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    pub player_id: String,
    pub result: String,
    pub reason: String,
    pub status: PlayerStatus,
}

impl PlayerResult {
    pub fn new(judgement: JudgeResult, status: PlayerStatus) -> Self {
        PlayerResult {
            player_id: judgement.player_id,
            result: judgement.result,
            reason: judgement.reason,
            status,
        }
    }
}

/// Player id -> status.
pub type StatusMap = BTreeMap<String, PlayerStatus>;

/// One round of a contest.
///
/// Created empty, filled with actions during collection, then with
/// results, positions, status and narrative during judgement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestRound {
    pub actions: BTreeMap<String, PlayerAction>,
    pub arena_description: String,
    #[serde(default)]
    pub narrative: String,
    pub positions: Positions,
    pub results: BTreeMap<String, PlayerResult>,
    pub status: StatusMap,
}

impl ContestRound {
    /// A fresh round continuing from `previous`: same positions and status,
    /// no actions or results yet.
    pub fn following(previous: &ContestRound, arena_description: &str, narrative: String) -> Self {
        ContestRound {
            actions: BTreeMap::new(),
            arena_description: arena_description.to_string(),
            narrative,
            positions: previous.positions.clone(),
            results: BTreeMap::new(),
            status: previous.status.clone(),
        }
    }
}
