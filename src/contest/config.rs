//! Contest configuration.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::ContestError;
use crate::grid::{GridFeature, GridSpec, DEFAULT_ATTEMPT_FACTOR};

/// Everything needed to set up a contest.
///
/// Read from JSON with camelCase keys; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContestConfig {
    /// Agent id of the arena oracle (features, narrative).
    pub arena: String,
    /// Agent id of the judge oracle (verdicts, positions, statuses).
    pub judge: String,
    /// Player agent ids, in turn order.
    pub players: Vec<String>,
    pub arena_description: String,
    pub arena_width: u32,
    pub arena_height: u32,
    /// Feature budget, required features included.
    pub max_features: usize,
    pub required_features: Vec<GridFeature>,
    /// Rules handed to players and judge on the first round.
    pub rules: String,
    /// Placement gives up after this many draws per field cell.
    pub placement_attempt_factor: u32,
    /// Random seed (0 = use entropy).
    pub seed: u64,
}

impl Default for ContestConfig {
    fn default() -> Self {
        ContestConfig {
            arena: "arena".to_string(),
            judge: "judge".to_string(),
            players: vec!["player1".to_string(), "player2".to_string()],
            arena_description: "A square arena".to_string(),
            arena_width: 10,
            arena_height: 10,
            max_features: 0,
            required_features: Vec::new(),
            rules: String::new(),
            placement_attempt_factor: DEFAULT_ATTEMPT_FACTOR,
            seed: 0,
        }
    }
}

impl ContestConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(s: &str) -> Result<Self, ContestError> {
        let config: ContestConfig =
            serde_json::from_str(s).map_err(|e| ContestError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContestError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ContestError::InvalidConfig(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Checks the constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ContestError> {
        if self.arena_width == 0 || self.arena_height == 0 {
            return Err(ContestError::InvalidConfig(format!(
                "arena must be at least 1x1, got {}x{}",
                self.arena_width, self.arena_height
            )));
        }
        if self.players.is_empty() {
            return Err(ContestError::InvalidConfig("no players".to_string()));
        }
        let mut seen = HashSet::new();
        for player in &self.players {
            if player.is_empty() {
                return Err(ContestError::InvalidConfig("empty player id".to_string()));
            }
            if !seen.insert(player.as_str()) {
                return Err(ContestError::InvalidConfig(format!("duplicate player '{player}'")));
            }
        }
        if self.placement_attempt_factor == 0 {
            return Err(ContestError::InvalidConfig(
                "placementAttemptFactor must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Field parameters for setup.
    pub fn grid_spec(&self) -> GridSpec {
        GridSpec {
            width: self.arena_width,
            height: self.arena_height,
            max_features: self.max_features,
            required_features: self.required_features.clone(),
            description: self.arena_description.clone(),
            attempt_factor: self.placement_attempt_factor,
        }
    }

    /// Notes for the given round: the rules on round 1, nothing after.
    pub fn extra_instructions(&self, round_number: u32) -> String {
        if round_number == 1 && !self.rules.is_empty() {
            format!("The rules are: {}", self.rules)
        } else {
            String::new()
        }
    }

    /// RNG for setup, seeded from `seed` unless it is 0.
    pub fn rng(&self) -> SmallRng {
        if self.seed != 0 {
            SmallRng::seed_from_u64(self.seed)
        } else {
            SmallRng::from_entropy()
        }
    }
}
