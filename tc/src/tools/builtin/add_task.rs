//! Add task tool - create a task from chat

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{MAX_TASK_TEXT, Origin, Priority, Recurrence, Task, validate_text};
use crate::tools::args::{optional_str, required_str, string_list};
use crate::tools::dates::parse_due_date;
use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{date_part, tags_of, task_json, text_of};

/// Create a task linked to the current conversation
///
/// Optional attributes are lenient: an unknown priority becomes medium, an
/// unknown recurrence becomes none and an unreadable due date is dropped.
pub struct AddTaskTool;

#[async_trait]
impl Tool for AddTaskTool {
    fn name(&self) -> ToolName {
        ToolName::AddTask
    }

    fn description(&self) -> &'static str {
        "Create a new task for the user with optional priority, tags, due date, and recurrence"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The task description"
                },
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "description": "Priority level (default: medium)"
                },
                "tags": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of tags/categories for the task"
                },
                "due_date": {
                    "type": "string",
                    "description": "Due date in natural language (e.g., 'tomorrow', '2026-01-15 14:00', 'next Friday')"
                },
                "recurrence": {
                    "type": "string",
                    "enum": ["daily", "weekly", "monthly"],
                    "description": "Recurrence pattern for repeating tasks"
                }
            },
            "required": ["text"]
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "add that task"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "AddTaskTool::execute: called");
        let text = validate_text(required_str(input, "text")?, MAX_TASK_TEXT)?;

        let mut task = Task::new(ctx.owner.clone(), text, Origin::Chat, ctx.now);
        task.conversation_id = ctx.conversation_id.clone();
        task.priority = optional_str(input, "priority")
            .and_then(|p| p.parse::<Priority>().ok())
            .unwrap_or_default();
        task.recurrence = optional_str(input, "recurrence")
            .and_then(|r| r.parse::<Recurrence>().ok())
            .unwrap_or_default();
        task.due_at = optional_str(input, "due_date").and_then(|d| parse_due_date(d, ctx.now));
        task.add_tags(string_list(input, "tags"));

        let task = ctx.tasks.create_task(task).await?;
        debug!(task_id = %task.id, "AddTaskTool::execute: task staged");
        Ok(json!({
            "task": task_json(&task, ctx.now),
            "message": "Task created successfully",
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        let task = result.get("task").unwrap_or(&Value::Null);
        let mut fragment = format!("I've added '{}' to your tasks", text_of(task));

        if let Some(priority) = task["priority"].as_str().filter(|p| *p != "medium") {
            fragment.push_str(&format!(" with {} priority", priority));
        }
        let tags = tags_of(task);
        if !tags.is_empty() {
            fragment.push_str(&format!(" tagged as {}", tags.join(", ")));
        }
        if let Some(date) = date_part(&task["due_date"]) {
            fragment.push_str(&format!(" due {}", date));
        }
        if let Some(recurrence) = task["recurrence"].as_str().filter(|r| *r != "none") {
            fragment.push_str(&format!(" (repeats {})", recurrence));
        }
        fragment.push_str(". ");
        fragment
    }
}
