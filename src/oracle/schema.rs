//! Output schemas for oracle requests.
//!
//! Every type the contest asks an oracle for declares the JSON schema sent
//! alongside the prompt. Validation itself is serde deserialization; the
//! schema tells the other side what shape to produce.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::grid::{GridFeature, Point};
use crate::round::{JudgeResult, PlayerAction, PlayerStatus};

/// A type that can be requested from an oracle.
pub trait OracleOutput: DeserializeOwned {
    /// JSON schema describing the serialized form of `Self`.
    fn schema() -> Value;
}

/// Returns true if the schema asks for free text.
pub fn is_string_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("string")
}

/// Schema for a point, optionally bounded to a `width x height` field.
pub fn point_schema(bounds: Option<(u32, u32)>) -> Value {
    match bounds {
        Some((width, height)) => json!({
            "type": "object",
            "properties": {
                "x": {"type": "integer", "minimum": 0, "maximum": width.saturating_sub(1)},
                "y": {"type": "integer", "minimum": 0, "maximum": height.saturating_sub(1)},
            },
            "required": ["x", "y"],
        }),
        None => json!({
            "type": "object",
            "properties": {
                "x": {"type": "integer"},
                "y": {"type": "integer"},
            },
            "required": ["x", "y"],
        }),
    }
}

/// Schema for a list of features, optionally bounded to the field.
pub fn feature_list_schema(bounds: Option<(u32, u32)>) -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "position": point_schema(bounds),
                "endPosition": point_schema(bounds),
            },
            "required": ["name", "position"],
        },
    })
}

impl OracleOutput for Point {
    fn schema() -> Value {
        point_schema(None)
    }
}

impl OracleOutput for Vec<GridFeature> {
    fn schema() -> Value {
        feature_list_schema(None)
    }
}

impl OracleOutput for Vec<JudgeResult> {
    fn schema() -> Value {
        json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "playerId": {"type": "string"},
                    "result": {"type": "string"},
                    "reason": {"type": "string"},
                },
                "required": ["playerId", "result", "reason"],
            },
        })
    }
}

impl OracleOutput for PlayerStatus {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string"},
                "health": {"type": "number"},
                "inventory": {"type": "array", "items": {"type": "string"}},
            },
            "required": ["status", "health", "inventory"],
        })
    }
}

impl OracleOutput for PlayerAction {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string"},
                "target": point_schema(None),
                "narration": {"type": "string"},
            },
            "required": ["action", "narration"],
        })
    }
}

impl OracleOutput for BTreeMap<String, Point> {
    fn schema() -> Value {
        json!({
            "type": "object",
            "additionalProperties": point_schema(None),
        })
    }
}

impl OracleOutput for String {
    fn schema() -> Value {
        json!({"type": "string"})
    }
}
