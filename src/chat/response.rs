//! Splits raw model output into the user-facing reply and the structured metadata line.
//!
//! Parsing never fails. Every line whose trimmed form starts with `META:` (any case) is removed
//! from the reply, wherever it appears; only the first such line is decoded. A metadata line
//! that is not a JSON object yields an empty mapping and leaves the reply untouched. The other
//! lines are rejoined with `\n` exactly as received, so CRLF replies keep their carriage returns.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::prompt::METADATA_PREFIX;

/// Free-form metadata emitted by the model; its keys are not interpreted.
pub type MetadataMapping = Map<String, Value>;

/// Reply text and metadata extracted from one model response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatReply {
    /// Text shown to the user.
    pub reply: String,
    /// Decoded metadata, empty when missing or malformed.
    pub meta: MetadataMapping,
}

#[derive(Debug, Error)]
enum MetadataParseError {
    #[error("metadata is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("metadata must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Split `raw` into reply text and metadata.
pub fn parse_response(raw: &str) -> ChatReply {
    let mut reply_lines = Vec::new();
    let mut metadata_line = None;

    for line in raw.split('\n') {
        match metadata_payload(line) {
            Some(payload) => {
                metadata_line.get_or_insert(payload);
            }
            None => reply_lines.push(line),
        }
    }

    let meta = match metadata_line {
        Some(payload) => decode_metadata(payload).unwrap_or_else(|error| {
            tracing::warn!(%error, "Discarding malformed reply metadata");
            MetadataMapping::new()
        }),
        None => MetadataMapping::new(),
    };

    ChatReply {
        reply: reply_lines.join("\n").trim().to_string(),
        meta,
    }
}

/// Remainder of `line` after the metadata prefix, if the line is a metadata line.
fn metadata_payload(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let prefix = trimmed.get(..METADATA_PREFIX.len())?;
    prefix
        .eq_ignore_ascii_case(METADATA_PREFIX)
        .then(|| &trimmed[METADATA_PREFIX.len()..])
}

fn decode_metadata(payload: &str) -> Result<MetadataMapping, MetadataParseError> {
    match serde_json::from_str::<Value>(payload.trim())? {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(MetadataParseError::NotAnObject("array")),
        Value::String(_) => Err(MetadataParseError::NotAnObject("string")),
        Value::Number(_) => Err(MetadataParseError::NotAnObject("number")),
        Value::Bool(_) => Err(MetadataParseError::NotAnObject("boolean")),
        Value::Null => Err(MetadataParseError::NotAnObject("null")),
    }
}
