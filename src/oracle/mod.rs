//! The generative oracle boundary.
//!
//! An oracle maps a prompt plus an output schema to a structured result.
//! The contest core only depends on the [`Oracle`] trait; everything it
//! asks for goes through [`generate`], which validates the response into a
//! concrete type before any phase sees it.

pub mod process;
pub mod response;
pub mod schema;
pub mod scripted;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use process::ProcessOracle;
pub use response::{extract_json, strip_envelope};
pub use schema::OracleOutput;
pub use scripted::ScriptedOracle;

/// Failures of a single oracle call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The oracle answered, but the answer does not fit the requested schema.
    #[error("oracle output failed validation: {0}")]
    Validation(String),

    /// The oracle could not be reached or reported an error.
    #[error("oracle transport failed: {0}")]
    Transport(String),
}

/// A single request to an oracle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleRequest {
    pub prompt: String,
    /// JSON schema describing the expected output.
    pub schema: Value,
}

/// What an oracle hands back before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleResponse {
    /// Output the provider already parsed into structured form.
    Object(Value),
    /// Raw model text, possibly wrapping JSON in prose or code fences.
    Text(String),
}

/// A prompt-to-structured-output capability.
///
/// Implementations must be shareable across threads: the judgement
/// pipeline issues independent calls concurrently.
pub trait Oracle: Send + Sync {
    fn generate(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for std::sync::Arc<O> {
    fn generate(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        (**self).generate(request)
    }
}

impl<O: Oracle + ?Sized> Oracle for &O {
    fn generate(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        (**self).generate(request)
    }
}

/// Asks `oracle` for a `T` and validates the answer.
pub fn generate<T, O>(oracle: &O, prompt: &str) -> Result<T, OracleError>
where
    T: OracleOutput,
    O: Oracle + ?Sized,
{
    generate_with_schema(oracle, prompt, T::schema())
}

/// Like [`generate`], with a caller-supplied schema (e.g. one carrying
/// field bounds).
pub fn generate_with_schema<T, O>(oracle: &O, prompt: &str, schema: Value) -> Result<T, OracleError>
where
    T: DeserializeOwned,
    O: Oracle + ?Sized,
{
    let request = OracleRequest { prompt: prompt.to_string(), schema };
    debug!(prompt_len = request.prompt.len(), "oracle request");
    let response = oracle.generate(&request)?;
    parse_response(response, &request.schema)
}

/// Validates a raw response against the output type.
pub fn parse_response<T: DeserializeOwned>(
    response: OracleResponse,
    schema: &Value,
) -> Result<T, OracleError> {
    let string_output = schema::is_string_schema(schema);
    let value = match response {
        OracleResponse::Object(value) => strip_envelope(value),
        OracleResponse::Text(text) if string_output => {
            let text = text.trim();
            match serde_json::from_str::<String>(text) {
                Ok(s) => Value::String(s),
                Err(_) => Value::String(text.to_string()),
            }
        }
        OracleResponse::Text(text) => extract_json(&text).ok_or_else(|| {
            OracleError::Validation(format!(
                "no JSON found in response: '{}'",
                truncate(&text, 80)
            ))
        })?,
    };
    serde_json::from_value(value).map_err(|e| OracleError::Validation(e.to_string()))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
