//! Pre-check summary extraction.
//!
//! The producer is inconsistent about where it places the summary payload:
//! the dedicated `PRE_CHECK_COMPLETE` event usually carries it directly, but
//! when that event is missed the terminal `OPERATION_COMPLETE` may carry it
//! in one of several nested locations. Every observed location is probed, in
//! the order the producer was seen to use them. Dropping a path loses real
//! summaries.

use serde_json::Value;

use crate::events::types::PreCheckSummary;

/// Probe order inside an `OPERATION_COMPLETE` payload
const OPERATION_COMPLETE_PATHS: &[&[&str]] = &[
    &["final_results", "data", "pre_check_summary"],
    &["pre_check_summary"],
    &["final_results", "pre_check_summary"],
];

/// Extract a summary from a `PRE_CHECK_COMPLETE` payload.
///
/// Tries `pre_check_summary`, then `summary`, then the payload itself when
/// it is shaped like a summary.
pub fn from_pre_check_complete(data: &Value) -> Option<PreCheckSummary> {
    if let Some(summary) = data.get("pre_check_summary").and_then(parse_summary) {
        return Some(summary);
    }
    if let Some(summary) = data.get("summary").and_then(parse_summary) {
        return Some(summary);
    }
    if PreCheckSummary::looks_like_summary(data) {
        return parse_summary(data);
    }
    None
}

/// Extract a summary from an `OPERATION_COMPLETE` payload, walking the
/// known nesting variants in order.
pub fn from_operation_complete(data: &Value) -> Option<PreCheckSummary> {
    OPERATION_COMPLETE_PATHS
        .iter()
        .filter_map(|path| value_at(data, path))
        .find_map(parse_summary)
}

/// Success heuristic shared by both completion handlers.
///
/// The producer signals success in three different ways depending on the
/// code path that emitted the terminal event; any one of them counts.
pub fn operation_succeeded(data: &Value) -> bool {
    if data.get("status").and_then(Value::as_str) == Some("SUCCESS") {
        return true;
    }
    if data.get("success").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    value_at(data, &["final_results", "success"]).and_then(Value::as_bool) == Some(true)
}

/// Error description pulled from a terminal payload, for the run log
pub fn operation_error(data: &Value) -> Option<String> {
    if let Some(error) = data.get("error").and_then(Value::as_str) {
        return Some(error.to_string());
    }
    value_at(data, &["final_results", "error"])
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_summary(value: &Value) -> Option<PreCheckSummary> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

fn value_at<'v>(root: &'v Value, path: &[&str]) -> Option<&'v Value> {
    let mut current = root;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}
