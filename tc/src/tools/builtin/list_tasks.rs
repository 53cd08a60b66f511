//! List tasks tool

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::Priority;
use crate::tools::args::optional_str;
use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{priority_marker, status_marker, tags_of, task_json, tasks_of, text_of};

/// List the owner's tasks with optional filtering and sorting
///
/// Without `sort_by` tasks come back oldest first, which is also the order
/// position numbers refer to.
pub struct ListTasksTool;

#[async_trait]
impl Tool for ListTasksTool {
    fn name(&self) -> ToolName {
        ToolName::ListTasks
    }

    fn description(&self) -> &'static str {
        "List all tasks for the user with optional filtering and sorting"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "description": "Filter by priority level"
                },
                "tag": {
                    "type": "string",
                    "description": "Filter by tag/category"
                },
                "sort_by": {
                    "type": "string",
                    "enum": ["priority", "date", "due_date"],
                    "description": "Sort tasks by priority, creation date (newest first) or due date"
                }
            },
            "required": []
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "list your tasks"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "ListTasksTool::execute: called");
        let mut tasks = ctx.tasks.list_tasks(&ctx.owner).await?;

        // Unknown priority filters are ignored rather than matching nothing
        if let Some(priority) = optional_str(input, "priority").and_then(|p| p.parse::<Priority>().ok()) {
            tasks.retain(|t| t.priority == priority);
        }
        if let Some(tag) = optional_str(input, "tag") {
            tasks.retain(|t| t.tags.contains(tag));
        }

        match optional_str(input, "sort_by") {
            Some("priority") => tasks.sort_by_key(|t| t.priority.rank()),
            Some("date") => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Some("due_date") => tasks.sort_by_key(|t| (t.due_at.is_none(), t.due_at)),
            _ => {}
        }

        debug!(count = tasks.len(), "ListTasksTool::execute: listing");
        let listed: Vec<Value> = tasks.iter().map(|t| task_json(t, ctx.now)).collect();
        Ok(json!({
            "count": listed.len(),
            "tasks": listed,
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        let tasks = tasks_of(result);
        if tasks.is_empty() {
            return "You have no tasks yet. ".to_string();
        }

        let mut fragment = format!("You have {} task(s):\n", tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            let tags = tags_of(task);
            let tags = if tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", tags.join(", "))
            };
            fragment.push_str(&format!(
                "{}. {} {} {}{}\n",
                i + 1,
                status_marker(task),
                priority_marker(task),
                text_of(task),
                tags
            ));
        }
        fragment
    }
}
