//! Recovers a JSON object from free-form model output.
//!
//! Models are told to answer with JSON only but may wrap it in prose or code
//! fences. Three passes, first hit wins:
//!
//! 1. top-level balanced `{...}` objects (string-aware), in order, whose
//!    parsed value carries the required key at the top level;
//! 2. the greedy span from the first `{` before the key to the last `}`;
//! 3. the whole text.

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::SearchError;

pub const PARSE_FAILURE: &str = "Failed to parse model response as JSON";

pub fn extract_json(raw: &str, key: &str) -> Result<Value, SearchError> {
    let needle = format!("\"{}\"", key);

    for candidate in balanced_objects(raw) {
        if !candidate.contains(&needle) {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            if value.get(key).is_some() {
                return Ok(value);
            }
        }
    }

    if let Some(span) = greedy_span(raw, key) {
        debug!("No balanced object carried \"{}\"; trying greedy span", key);
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return Ok(value);
        }
    }

    serde_json::from_str::<Value>(raw.trim()).map_err(|e| {
        debug!("Whole-text parse failed: {}", e);
        SearchError::Parse(PARSE_FAILURE.to_string())
    })
}

/// Top-level balanced `{...}` substrings, in order. Objects nested inside an
/// earlier balanced object are not candidates. Braces inside JSON strings are
/// ignored.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find('{') {
        let start = pos + found;
        match matching_close(text, start) {
            Some(end) => {
                objects.push(&text[start..=end]);
                pos = end + 1;
            }
            None => pos = start + 1,
        }
    }

    objects
}

fn matching_close(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}

fn greedy_span<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!(r#"\{{[\s\S]*"{}"[\s\S]*\}}"#, regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.find(text).map(|m| m.as_str())
}
