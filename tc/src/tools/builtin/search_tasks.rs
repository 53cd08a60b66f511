//! Search tasks tool

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::tools::args::required_str;
use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{priority_marker, status_marker, task_json, tasks_of, text_of};

/// Case-insensitive substring search over task text
pub struct SearchTasksTool;

#[async_trait]
impl Tool for SearchTasksTool {
    fn name(&self) -> ToolName {
        ToolName::SearchTasks
    }

    fn description(&self) -> &'static str {
        "Search for tasks by keyword"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search keyword to find in task text"
                }
            },
            "required": ["query"]
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "search tasks"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "SearchTasksTool::execute: called");
        let query = required_str(input, "query")?.trim();
        if query.is_empty() {
            return Err(ToolError::validation("Search query cannot be empty"));
        }

        let needle = query.to_lowercase();
        let matches: Vec<Value> = ctx
            .tasks
            .list_tasks(&ctx.owner)
            .await?
            .iter()
            .filter(|t| t.text.to_lowercase().contains(&needle))
            .map(|t| task_json(t, ctx.now))
            .collect();

        debug!(count = matches.len(), "SearchTasksTool::execute: matched");
        Ok(json!({
            "query": query,
            "count": matches.len(),
            "tasks": matches,
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        let query = result.get("query").and_then(Value::as_str).unwrap_or_default();
        let tasks = tasks_of(result);
        if tasks.is_empty() {
            return format!("No tasks found matching '{}'. ", query);
        }

        let mut fragment = format!("Found {} task(s) matching '{}':\n", tasks.len(), query);
        for (i, task) in tasks.iter().enumerate() {
            fragment.push_str(&format!(
                "{}. {} {} {}\n",
                i + 1,
                status_marker(task),
                priority_marker(task),
                text_of(task)
            ));
        }
        fragment
    }
}
