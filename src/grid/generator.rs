//! Initial field generation.
//!
//! A field gets its mandatory features first, then up to the feature
//! budget from the arena oracle, then one free cell per player.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::placement::{place_features, random_position};
use super::point::{player_key, GridFeature, Positions};
use super::GridError;
use crate::oracle::schema::feature_list_schema;
use crate::oracle::{generate_with_schema, Oracle, OracleError};

/// Default multiple of the field area allowed for placement draws.
pub const DEFAULT_ATTEMPT_FACTOR: u32 = 10;

/// Parameters of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSpec {
    pub width: u32,
    pub height: u32,
    /// Feature budget, required features included.
    pub max_features: usize,
    pub required_features: Vec<GridFeature>,
    pub description: String,
    /// Player placement gives up after `attempt_factor * width * height` draws.
    pub attempt_factor: u32,
}

impl GridSpec {
    pub fn new(width: u32, height: u32, description: impl Into<String>) -> Self {
        GridSpec {
            width,
            height,
            max_features: 0,
            required_features: Vec::new(),
            description: description.into(),
            attempt_factor: DEFAULT_ATTEMPT_FACTOR,
        }
    }

    /// Draw budget for a single player placement.
    pub fn max_attempts(&self) -> u64 {
        (self.attempt_factor as u64)
            .saturating_mul(self.width as u64)
            .saturating_mul(self.height as u64)
            .max(1)
    }

    /// Number of features to request from the oracle.
    pub fn proposed_count(&self) -> usize {
        self.max_features.saturating_sub(self.required_features.len())
    }
}

/// A generated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub description: String,
    pub features: Positions,
}

/// Asks the oracle for `count` features inside the field.
///
/// Order, names and positions are whatever the oracle returns; duplicates
/// are allowed. Features with any point outside the field fail validation.
pub fn propose_features<O: Oracle + ?Sized>(
    oracle: &O,
    description: &str,
    width: u32,
    height: u32,
    count: usize,
) -> Result<Vec<GridFeature>, OracleError> {
    let prompt = [
        format!("This arena is \"{description}\""),
        format!("Please generate {count} random features for the arena"),
        format!("these will be used to generate the arena grid ({width}x{height})"),
        "The features should be objects the players can use to complete the game, \
         or obstacles the players must avoid"
            .to_string(),
        "Respond in JSON: [{\"name\": <name>, \"position\": {\"x\": <number>, \"y\": <number>}, \
         \"endPosition\" (optional): {\"x\": <number>, \"y\": <number>}}]"
            .to_string(),
        "Lines such as walls or cars use endPosition".to_string(),
    ]
    .join("\n");

    let features: Vec<GridFeature> =
        generate_with_schema(oracle, &prompt, feature_list_schema(Some((width, height))))?;

    if let Some(outside) = features.iter().find(|f| !f.within(width, height)) {
        return Err(OracleError::Validation(format!(
            "feature '{}' lies outside the {}x{} field",
            outside.name, width, height
        )));
    }
    debug!(count = features.len(), "oracle proposed features");
    Ok(features)
}

/// Builds the initial positions map.
///
/// Places the required features, then (budget permitting) the oracle's
/// proposals, then each player in order on a cell not yet taken by a
/// feature or an earlier player. Any failure aborts the whole grid.
pub fn generate_grid<O: Oracle + ?Sized>(
    spec: &GridSpec,
    player_ids: &[String],
    oracle: &O,
    rng: &mut impl Rng,
) -> Result<Grid, GridError> {
    if spec.width == 0 || spec.height == 0 {
        return Err(GridError::InvalidSize { width: spec.width, height: spec.height });
    }

    let mut features = Positions::new();
    if !spec.required_features.is_empty() {
        info!(count = spec.required_features.len(), "adding required features");
        place_features(&mut features, &spec.required_features);
    }

    let proposed = spec.proposed_count();
    if proposed > 0 {
        let extra = propose_features(oracle, &spec.description, spec.width, spec.height, proposed)?;
        place_features(&mut features, &extra);
    }

    let max_attempts = spec.max_attempts();
    for player_id in player_ids {
        let position = random_position(spec.height, spec.width, &features, max_attempts, rng)?;
        features.insert(player_key(player_id), position);
        debug!(player = %player_id, at = %position, "placed player");
    }

    Ok(Grid {
        description: format!("{} a ({}x{}) grid", spec.description, spec.height, spec.width),
        features,
    })
}
