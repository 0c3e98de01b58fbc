//! Two-tier parser for model-produced chunk JSON.
//!
//! Tier 1 parses the trimmed response as-is. Tier 2 cuts the text down to the
//! span matched by `(?s)\{.*\}`: from the first `{` to the last `}` inclusive,
//! across newlines. That drops prose and code fences around a single object,
//! but cannot repair an object whose braces are unbalanced or a response with
//! two top-level objects. A tier only succeeds if the value is an object that
//! has both `academic_context` and `chunks`. Nested fields are read leniently
//! (see [`Chunk`](super::types::Chunk)), so a malformed chunk degrades on its
//! own instead of failing the tier.

use super::types::ChunkSet;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref OUTER_OBJECT: Regex = Regex::new(r"(?s)\{.*\}").expect("static regex");
}

const REQUIRED_KEYS: [&str; 2] = ["academic_context", "chunks"];

/// Which tier produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMethod {
    Direct,
    Salvaged,
}

/// Span from the first `{` to the last `}`, if any
pub fn outer_object(text: &str) -> Option<&str> {
    OUTER_OBJECT.find(text).map(|m| m.as_str())
}

fn parse_strict(text: &str) -> Option<ChunkSet> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;
    if !REQUIRED_KEYS.iter().all(|k| object.contains_key(*k)) {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(set) => Some(set),
        Err(e) => {
            tracing::debug!("Chunk JSON has required keys but bad fields: {}", e);
            None
        }
    }
}

/// Parse a chunk set, reporting which tier succeeded
pub fn try_parse_chunk_set(text: &str) -> Option<(ChunkSet, ParseMethod)> {
    let trimmed = text.trim();
    if let Some(set) = parse_strict(trimmed) {
        return Some((set, ParseMethod::Direct));
    }
    tracing::debug!("Direct JSON parsing failed, attempting salvage");
    outer_object(trimmed)
        .and_then(parse_strict)
        .map(|set| (set, ParseMethod::Salvaged))
}

/// Parse a chunk set, degrading to [`ChunkSet::empty`] when both tiers fail
pub fn parse_chunk_set(text: &str) -> ChunkSet {
    try_parse_chunk_set(text)
        .map(|(set, _)| set)
        .unwrap_or_else(ChunkSet::empty)
}
