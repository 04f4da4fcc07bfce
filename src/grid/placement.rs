//! Writing features and players into a positions map.

use rand::Rng;
use tracing::debug;

use super::point::{feature_cell_key, feature_key, GridFeature, Point, Positions};
use super::GridError;

/// Writes one feature into `positions`.
///
/// Point features land under `feature:<name>`; line features are
/// rasterized and each cell lands under `feature:<name>.<i>`.
pub fn place_feature(positions: &mut Positions, feature: &GridFeature) {
    if feature.end_position.is_none() {
        positions.insert(feature_key(&feature.name), feature.position);
        debug!(name = %feature.name, at = %feature.position, "placed feature");
        return;
    }
    for (i, cell) in feature.cells().into_iter().enumerate() {
        positions.insert(feature_cell_key(&feature.name, i), cell);
        debug!(name = %feature.name, index = i, at = %cell, "placed feature cell");
    }
}

/// Writes features in input order. Later features overwrite earlier ones
/// only when name and cell index coincide.
pub fn place_features(positions: &mut Positions, features: &[GridFeature]) {
    for feature in features {
        place_feature(positions, feature);
    }
}

/// Draws a uniformly random cell of a `width x height` field that no
/// entry of `occupied` sits on.
///
/// Rejection sampling: each draw is `floor(u * width), floor(u * height)`
/// with `u` uniform in `[0, 1)`. Gives up with
/// [`GridError::PlacementExhausted`] after `max_attempts` rejected draws.
pub fn random_position(
    height: u32,
    width: u32,
    occupied: &Positions,
    max_attempts: u64,
    rng: &mut impl Rng,
) -> Result<Point, GridError> {
    if width == 0 || height == 0 {
        return Err(GridError::InvalidSize { width, height });
    }
    for _ in 0..max_attempts {
        let x = (rng.gen::<f64>() * width as f64).floor() as i32;
        let y = (rng.gen::<f64>() * height as f64).floor() as i32;
        let candidate = Point::new(x, y);
        if !occupied.is_occupied(candidate) {
            return Ok(candidate);
        }
    }
    Err(GridError::PlacementExhausted { attempts: max_attempts, width, height })
}
