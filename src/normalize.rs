//! Turns the untrusted free-text model reply into a validated [`AnalysisCore`].

use crate::error::AnalysisError;
use crate::record::{AnalysisCore, HealingStage, MAX_LIST_ENTRIES, MAX_SEVERITY, WoundType};
use serde_json::Value;

/// Returns the span from the first `{` to the last `}` of `text`.
///
/// This is a greedy heuristic, not a JSON-aware scanner: prose containing braces
/// before or after the payload widens the span.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Extracts, parses and normalizes a model reply.
pub fn normalize_response(text: &str) -> Result<AnalysisCore, AnalysisError> {
    let block = extract_json_block(text).ok_or(AnalysisError::NoJsonFound)?;
    let value: Value = serde_json::from_str(block)?;
    Ok(normalize_value(&value))
}

/// Normalizes each field independently; a bad field falls back to its default.
pub fn normalize_value(value: &Value) -> AnalysisCore {
    AnalysisCore {
        wound_type: scalar_text(value.get("type"))
            .map(|label| WoundType::from_label(&label))
            .unwrap_or_default(),
        stage: scalar_text(value.get("stage"))
            .map(|label| HealingStage::from_label(&label))
            .unwrap_or_default(),
        severity: normalize_severity(value.get("severity")),
        precautions: normalize_list(value.get("precautions")),
        meds: normalize_list(value.get("meds")),
    }
}

/// Coerces to a number (non-numeric is 0), clamps to `[0, 100]` and rounds.
pub fn normalize_severity(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, f64::from(MAX_SEVERITY)).round() as u8
}

/// Keeps only non-empty scalar entries of an array, in order, capped at four.
pub fn normalize_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| scalar_text(Some(item)))
        .take(MAX_LIST_ENTRIES)
        .collect()
}

// Trimmed text of a scalar JSON value; null, containers and blank strings yield None.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}
