//! Ranking and relevance prompt construction, and tolerant reply parsing.
//!
//! Replies are untrusted: models wrap JSON in prose or code fences, invent
//! keys, drop keys, or answer with a bare list. The parser extracts the first
//! syntactically valid ordering it can find and sanitizes it against the
//! batch's known keys.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::MissingKeyPolicy;

/// Token overhead budgeted for the fixed reply-format instructions.
pub const PROMPT_OVERHEAD_TOKENS: usize = 60;

/// Token overhead budgeted per enumerated item (key, separator, newline).
pub const ITEM_OVERHEAD_TOKENS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no usable keys in ranking reply")]
    EmptyRanking,
}

// =============================================================================
// Prompt construction
// =============================================================================

/// Assemble the ranking prompt: instruction, enumerated items, reply format.
pub fn build_ranking_prompt(initial_prompt: &str, items: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        initial_prompt.len() + items.iter().map(|(k, v)| k.len() + v.len() + 4).sum::<usize>() + 256,
    );
    out.push_str(initial_prompt.trim());
    out.push_str(
        "\n\nRank the following items from most to least relevant. \
         Each item is identified by its key.\n\n",
    );
    for (key, value) in items {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    out.push_str(
        "\nRespond with a JSON object of the form {\"ranking\": [\"<key>\", ...]} \
         listing every key above exactly once, from most to least relevant. \
         Output only the JSON object.",
    );
    out
}

/// Schema hint for providers that support structured output.
pub fn ranking_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ranking": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["ranking"],
        "additionalProperties": false
    })
}

/// Assemble the single-item justification prompt for the relevance pass.
pub fn build_relevance_prompt(initial_prompt: &str, value: &str) -> String {
    format!(
        "{}\n\nIn one or two sentences, explain why the following item is relevant \
         to the instruction above, or reply \"not relevant\" if it is not.\n\n{}\n\n\
         Respond with a JSON object of the form {{\"relevance\": \"<justification>\"}}.",
        initial_prompt.trim(),
        value
    )
}

pub fn relevance_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "relevance": { "type": "string" }
        },
        "required": ["relevance"],
        "additionalProperties": false
    })
}

// =============================================================================
// Reply parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct RankingReplyJson {
    #[serde(default)]
    ranking: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RelevanceReplyJson {
    #[serde(default)]
    relevance: Option<String>,
}

/// Parse a ranking reply into a sanitized ordering over the batch's keys.
///
/// Unknown keys are dropped, the first occurrence of a duplicate wins, and
/// keys the model omitted are handled per `policy`. Fails only when not a
/// single known key can be recovered.
pub fn parse_ranking_reply(
    raw: &str,
    batch_keys: &[String],
    policy: MissingKeyPolicy,
) -> Result<Vec<String>, ParseError> {
    let known: HashSet<&str> = batch_keys.iter().map(String::as_str).collect();

    let mut ordering = extract_json_span(raw)
        .and_then(parse_json_keys)
        .map(|candidates| sanitize(&candidates, &known))
        .unwrap_or_default();
    if ordering.is_empty() {
        // The JSON span may have been an echoed format template; a token
        // scan still recovers orderings given as plain lists.
        ordering = sanitize(&fallback_keys(raw, &known), &known);
    }

    if ordering.is_empty() {
        return Err(ParseError::EmptyRanking);
    }

    if policy == MissingKeyPolicy::AppendInOrder {
        let present: HashSet<&str> = ordering.iter().map(String::as_str).collect();
        let missing: Vec<String> = batch_keys
            .iter()
            .filter(|key| !present.contains(key.as_str()))
            .cloned()
            .collect();
        ordering.extend(missing);
    }

    Ok(ordering)
}

/// Parse a relevance reply; falls back to the raw text when it is not JSON.
pub fn parse_relevance_reply(raw: &str) -> Option<String> {
    if let Some(span) = extract_json_span(raw) {
        if let Ok(parsed) = serde_json::from_str::<RelevanceReplyJson>(span) {
            if let Some(text) = parsed.relevance {
                let text = text.trim().to_string();
                return (!text.is_empty()).then_some(text);
            }
        }
    }
    let text = raw.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Find the first balanced JSON object or array in the reply. Handles
/// fenced code blocks and surrounding prose by scanning for the opener.
fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find(['{', '['])?;
    let rest = &raw[start..];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_json_keys(span: &str) -> Option<Vec<String>> {
    if span.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(span).ok();
    }
    serde_json::from_str::<RankingReplyJson>(span)
        .ok()
        .and_then(|r| r.ranking)
}

/// Keep only known keys, first occurrence of each.
fn sanitize(candidates: &[String], known: &HashSet<&str>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(candidates.len());
    candidates
        .iter()
        .filter(|key| known.contains(key.as_str()) && seen.insert(key.as_str()))
        .cloned()
        .collect()
}

/// Last resort: collect tokens that exactly match a known key, in order.
fn fallback_keys(raw: &str, known: &HashSet<&str>) -> Vec<String> {
    raw.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| known.contains(token))
        .map(|token| token.to_string())
        .collect()
}
