//! Recovery of JSON payloads from free-form model output.
//!
//! Models wrap JSON in markdown fences and surround it with prose. The
//! extraction rules are:
//!
//! 1. If the text contains a fence opened with "```json", take everything
//!    between that opening fence and the next closing fence.
//! 2. Otherwise, if it contains any fence, take the inside of the first block.
//! 3. Otherwise use the text as is. If it does not parse, fall back to the
//!    first top-level `{...}` or `[...]` value, but only when no second
//!    bracketed value follows it.
//!
//! The chosen candidate is trimmed and must parse as JSON; nothing partial is
//! ever returned.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::error::{GenesisError, Result};

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Extract and parse the JSON value carried by a model response.
pub fn extract_json(raw: &str) -> Result<Value> {
    let parsed = match fenced_content(raw) {
        Some(inner) => serde_json::from_str(inner.trim()).map_err(|e| e.to_string()),
        None => parse_unfenced(raw.trim()),
    };

    parsed.map_err(|message| {
        error!(error = %message, raw = %raw, "Failed to parse JSON response");
        GenesisError::malformed(message, raw)
    })
}

/// Extract JSON and deserialize it into `T`.
///
/// Shape mismatches are reported as malformed output, like parse failures.
pub fn extract_json_as<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).map_err(|e| {
        error!(error = %e, raw = %raw, "Model JSON has unexpected shape");
        GenesisError::malformed(e.to_string(), raw)
    })
}

/// Candidate text selected by the fence rules, if the text has any fence.
fn fenced_content(text: &str) -> Option<&str> {
    if let Some((_, rest)) = text.split_once(JSON_FENCE) {
        return rest.split(FENCE).next();
    }
    if text.contains(FENCE) {
        return text.split(FENCE).nth(1);
    }
    None
}

fn parse_unfenced(text: &str) -> std::result::Result<Value, String> {
    let direct_err = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    let Some(start) = text.find(['{', '[']) else {
        return Err(direct_err);
    };
    let Some(end) = balanced_end(text, start) else {
        return Err(direct_err);
    };

    let rest = &text[end + 1..];
    if let Some(next) = rest.find(['{', '[']) {
        if balanced_end(rest, next).is_some() {
            return Err(format!(
                "{} (response contains more than one JSON value)",
                direct_err
            ));
        }
    }

    serde_json::from_str(&text[start..=end]).map_err(|e| e.to_string())
}

/// Byte index of the bracket closing the one at `start`, skipping string contents.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
