//! Primitive geometry and feature types.
//!
//! Points are plain integer coordinates. Features are either single points
//! or line segments, and every located thing in a contest (feature cell or
//! player) lives in one namespaced `Positions` map.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key prefix for feature cells.
pub const FEATURE_PREFIX: &str = "feature:";

/// Key prefix for player positions.
pub const PLAYER_PREFIX: &str = "player:";

/// A cell on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    /// Returns true if the point lies inside a `width x height` field.
    pub fn within(self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as i64) < width as i64 && (self.y as i64) < height as i64
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Errors from parsing the `x,y` point notation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PointParseError {
    #[error("expected 'x,y', got '{0}'")]
    Malformed(String),

    #[error("invalid coordinate '{0}'")]
    InvalidCoordinate(String),
}

impl FromStr for Point {
    type Err = PointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| PointParseError::Malformed(s.to_string()))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<i32>()
                .map_err(|_| PointParseError::InvalidCoordinate(v.to_string()))
        };
        Ok(Point::new(parse(x)?, parse(y)?))
    }
}

/// A named static element of the field: a point, or a line from
/// `position` to `end_position` inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridFeature {
    pub name: String,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_position: Option<Point>,
}

impl GridFeature {
    /// Creates a single-cell feature.
    pub fn point(name: impl Into<String>, position: Point) -> Self {
        GridFeature { name: name.into(), position, end_position: None }
    }

    /// Creates a line feature spanning `start` to `end`.
    pub fn line(name: impl Into<String>, start: Point, end: Point) -> Self {
        GridFeature { name: name.into(), position: start, end_position: Some(end) }
    }

    /// Rasterizes the feature into the cells it covers.
    ///
    /// Lines step along the dominant axis: for `i` in `0..=steps` where
    /// `steps = max(|dx|, |dy|)`, the cell is `start + d * i / steps` with
    /// each component floored. This yields exactly `steps + 1` cells
    /// including both endpoints, and a single cell when start equals end.
    pub fn cells(&self) -> Vec<Point> {
        let Some(end) = self.end_position else {
            return vec![self.position];
        };
        let start = self.position;
        let dx = end.x as i64 - start.x as i64;
        let dy = end.y as i64 - start.y as i64;
        let steps = dx.abs().max(dy.abs());
        if steps == 0 {
            return vec![start];
        }
        (0..=steps)
            .map(|i| {
                Point::new(
                    (start.x as i64 + (dx * i).div_euclid(steps)) as i32,
                    (start.y as i64 + (dy * i).div_euclid(steps)) as i32,
                )
            })
            .collect()
    }

    /// Returns true if every endpoint lies inside the field.
    pub fn within(&self, width: u32, height: u32) -> bool {
        self.position.within(width, height)
            && self.end_position.map_or(true, |end| end.within(width, height))
    }
}

/// Key for a point feature.
pub fn feature_key(name: &str) -> String {
    format!("{FEATURE_PREFIX}{name}")
}

/// Key for the `index`-th cell of a line feature.
pub fn feature_cell_key(name: &str, index: usize) -> String {
    format!("{FEATURE_PREFIX}{name}.{index}")
}

/// Key for a player position.
pub fn player_key(player_id: &str) -> String {
    format!("{PLAYER_PREFIX}{player_id}")
}

/// Namespaced key -> point index of everything on the field.
///
/// Keys are `feature:<name>`, `feature:<name>.<i>` or `player:<id>`.
/// Inserting an existing key overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Positions(BTreeMap<String, Point>);

impl Positions {
    pub fn new() -> Self {
        Positions(BTreeMap::new())
    }

    /// Writes `point` under `key`, returning the previous point if any.
    pub fn insert(&mut self, key: impl Into<String>, point: Point) -> Option<Point> {
        self.0.insert(key.into(), point)
    }

    pub fn get(&self, key: &str) -> Option<Point> {
        self.0.get(key).copied()
    }

    /// Position of a player, if placed.
    pub fn player(&self, player_id: &str) -> Option<Point> {
        self.get(&player_key(player_id))
    }

    /// Returns true if any key maps to `point`.
    pub fn is_occupied(&self, point: Point) -> bool {
        self.0.values().any(|p| *p == point)
    }

    /// Overwrites entries with those of `updates`; other keys are kept.
    pub fn merge(&mut self, updates: Positions) {
        self.0.extend(updates.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Point> {
        self.0.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Point> {
        self.0.keys()
    }
}

impl FromIterator<(String, Point)> for Positions {
    fn from_iter<I: IntoIterator<Item = (String, Point)>>(iter: I) -> Self {
        Positions(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Positions {
    type Item = (&'a String, &'a Point);
    type IntoIter = btree_map::Iter<'a, String, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
