//! Ranking input and output documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Length of the short document key (hex prefix of the value hash).
pub const KEY_LEN: usize = 8;

/// Derive the stable short key for a rendered document value.
///
/// Identical rendered values produce identical keys, so duplicate inputs
/// collapse into a single ledger entry.
pub fn derive_key(value: &str) -> String {
    let hex = blake3::hash(value.as_bytes()).to_hex();
    hex[..KEY_LEN].to_string()
}

/// One unit of ranking input. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Short stable identifier, derived from the rendered value.
    pub key: String,
    /// Rendered text shown to the model.
    pub value: String,
    /// Original structured source, carried through to output untouched.
    pub object: Value,
}

impl Document {
    pub fn new(value: impl Into<String>, object: Value) -> Self {
        let value = value.into();
        Self {
            key: derive_key(&value),
            value,
            object,
        }
    }

    /// Document whose source is just the rendered text itself.
    pub fn from_text(value: impl Into<String>) -> Self {
        let value = value.into();
        let object = Value::String(value.clone());
        Self::new(value, object)
    }
}

/// One entry of the final ranked output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDocument {
    pub key: String,
    pub value: String,
    pub object: Value,
    /// Mean returned rank across exposures; lower is more relevant.
    pub score: f64,
    /// Number of trials in which the document appeared in a scored batch.
    pub exposure: u32,
    /// 1-based final rank.
    pub rank: usize,
    /// Model-provided justification, when the relevance pass ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<String>,
}
