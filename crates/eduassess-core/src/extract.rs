//! Extraction and sanitization of model output.
//!
//! The scoring service returns free text that should contain a single
//! JSON object but may be wrapped in Markdown code fences or surrounded
//! by prose. Extraction strips the fences and locates the first
//! *balanced* `{...}` object; slicing from the first `{` to the last
//! `}` is not enough once the model appends prose after the JSON.
//!
//! Parsing is two-stage: a strict typed decode first, then a lenient
//! field-by-field coercion when the model bends the types. Either way
//! the result passes through [`sanitize`], so the invariants on
//! [`ComparisonResult`] hold no matter what the model sent.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{ComparisonResult, PASS_THRESHOLD};
use crate::error::ScoringError;

/// Maximum feedback length kept after sanitization.
const FEEDBACK_MAX_CHARS: usize = 200;

/// Feedback used when the model omitted one.
const FEEDBACK_PLACEHOLDER: &str = "No feedback provided";

/// Pull the first balanced JSON object out of raw model output.
pub fn extract_json_object(raw: &str) -> Option<String> {
    let cleaned = strip_code_fences(raw);
    find_json_object(&cleaned).map(str::to_string)
}

/// Parse an extracted JSON object into a sanitized [`ComparisonResult`].
pub fn parse_comparison(json: &str) -> Result<ComparisonResult, ScoringError> {
    let value: Value = serde_json::from_str(json)?;

    match serde_json::from_value::<RawComparison>(value.clone()) {
        Ok(raw) => Ok(sanitize(raw.similarity, raw.score, Some(raw.feedback))),
        Err(_) => {
            // Field-level type mismatch: coerce what we can, zero the rest.
            let similarity = coerce_number(value.get("similarity"));
            let score = coerce_number(value.get("score"));
            let feedback = value
                .get("feedback")
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(sanitize(similarity, score, feedback))
        }
    }
}

/// Clamp, truncate and make the result internally consistent.
///
/// `passed` is always recomputed from the sanitized score; an upstream
/// `passed` flag that disagrees with the score is never trusted.
fn sanitize(similarity: f64, score: f64, feedback: Option<String>) -> ComparisonResult {
    let similarity = clamp_percent(similarity);
    let score = clamp_percent(score);
    let feedback = match feedback {
        Some(text) if !text.is_empty() => truncate_chars(&text, FEEDBACK_MAX_CHARS),
        _ => FEEDBACK_PLACEHOLDER.to_string(),
    };

    ComparisonResult {
        similarity,
        feedback,
        score,
        passed: score >= PASS_THRESHOLD,
    }
}

/// Strict wire shape of the model's grading object.
#[derive(Debug, Deserialize)]
struct RawComparison {
    similarity: f64,
    feedback: String,
    score: f64,
    // Present in the instructed format but recomputed during
    // sanitization, so a missing or lying value is irrelevant.
    #[serde(default)]
    #[allow(dead_code)]
    passed: bool,
}

fn clamp_percent(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    }
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Scan for the first balanced `{...}` object, tolerating nested braces
/// and braces inside string literals.
fn find_json_object(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = scan_balanced(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        // This `{` never balances; try the next one.
        search_from = start + 1;
    }
    None
}

/// Length of the balanced object starting at the first byte of `text`,
/// which must be `{`. Returns `None` if the object never closes.
fn scan_balanced(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
