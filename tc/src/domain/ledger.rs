//! Tool invocation ledger
//!
//! Every tool call executed during a chat turn is recorded on the assistant
//! message as `{function, args, result}`. The ledger is what later turns read
//! to recover which task a list position referred to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::TaskId;

/// Outcome of a single tool call
///
/// Serializes flat: `{"success": true, "tasks": [...]}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ToolResult {
    /// Successful result; non-object payloads are stored under `value`
    pub fn success(payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            success: true,
            error: None,
            payload,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            payload: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Task IDs of a list-like result, in listed order
    ///
    /// A result is list-like when it succeeded and carries a `tasks` array.
    pub fn listed_task_ids(&self) -> Option<Vec<TaskId>> {
        if !self.success {
            return None;
        }
        let tasks = self.payload.get("tasks")?.as_array()?;
        Some(
            tasks
                .iter()
                .filter_map(|t| t.get("id").and_then(Value::as_str))
                .filter_map(|id| TaskId::parse(id).ok())
                .collect(),
        )
    }
}

/// One executed tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub function: String,
    pub args: Value,
    pub result: ToolResult,
}
