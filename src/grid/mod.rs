//! Field geometry and initial placement.
//!
//! Contains the point and feature types, the namespaced positions map,
//! and the generator that lays out features and players for setup.

pub mod generator;
pub mod placement;
pub mod point;

use thiserror::Error;

use crate::oracle::OracleError;

pub use generator::{generate_grid, propose_features, Grid, GridSpec, DEFAULT_ATTEMPT_FACTOR};
pub use placement::{place_feature, place_features, random_position};
pub use point::{
    feature_cell_key, feature_key, player_key, GridFeature, Point, PointParseError, Positions,
    FEATURE_PREFIX, PLAYER_PREFIX,
};

/// Errors from building a field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("no free cell found on the {width}x{height} field after {attempts} draws")]
    PlacementExhausted { attempts: u64, width: u32, height: u32 },

    #[error("invalid field size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}
