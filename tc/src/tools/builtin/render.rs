//! Shared JSON shapes and narrative pieces for the built-in tools

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::domain::{Priority, Task, ToolResult};

pub(crate) const TASK_REF_DESCRIPTION: &str = "The task identifier - either the full task ID or the task's \
     position number ('1' for the first task, '2' for the second task)";

/// Wire shape of a task inside tool results
pub(crate) fn task_json(task: &Task, now: DateTime<Utc>) -> Value {
    json!({
        "id": task.id.as_str(),
        "text": task.text,
        "completed": task.completed,
        "priority": task.priority.as_str(),
        "tags": task.tags,
        "due_date": task.due_at.map(timestamp),
        "recurrence": task.recurrence.as_str(),
        "overdue": task.is_overdue(now),
    })
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `YYYY-MM-DD` part of a serialized timestamp
pub(crate) fn date_part(value: &Value) -> Option<&str> {
    value.as_str().and_then(|s| s.get(..10))
}

pub(crate) fn text_of(task: &Value) -> &str {
    task["text"].as_str().unwrap_or_default()
}

pub(crate) fn status_marker(task: &Value) -> &'static str {
    if task["completed"].as_bool().unwrap_or(false) { "✓" } else { "○" }
}

pub(crate) fn priority_marker(task: &Value) -> &'static str {
    task["priority"]
        .as_str()
        .and_then(|p| p.parse::<Priority>().ok())
        .unwrap_or_default()
        .emoji()
}

pub(crate) fn tags_of(task: &Value) -> Vec<&str> {
    task["tags"]
        .as_array()
        .map(|tags| tags.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

pub(crate) fn tasks_of(result: &ToolResult) -> &[Value] {
    result
        .get("tasks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// The `message` of a mutating tool's result as a reply fragment
pub(crate) fn message_fragment(result: &ToolResult) -> String {
    let message = result.get("message").and_then(Value::as_str).unwrap_or_default();
    format!("{} ", message)
}
