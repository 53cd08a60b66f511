//! Argument extraction helpers shared by the built-in tools

use serde_json::Value;

use super::ToolError;

/// A required string parameter
pub fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    input
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::validation(format!("Missing required parameter: {}", key)))
}

/// An optional string parameter; blank strings count as absent
pub fn optional_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// A list of strings; a bare string is split on commas
pub fn string_list(input: &Value, key: &str) -> Vec<String> {
    match input.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// The `task_id` reference; planners sometimes send ordinals as numbers
pub fn task_ref(input: &Value) -> Result<String, ToolError> {
    match input.get("task_id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ToolError::validation("Missing required parameter: task_id")),
    }
}
