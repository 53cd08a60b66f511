//! Set due date tool

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::tools::args::{required_str, task_ref};
use crate::tools::dates::parse_due_date;
use crate::tools::resolver::resolve;
use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{TASK_REF_DESCRIPTION, message_fragment, task_json, timestamp};

/// Set or clear a task's due date
///
/// Text that cannot be read as a date clears the due date; the call still
/// succeeds and reports `due_date: null`.
pub struct SetDueDateTool;

#[async_trait]
impl Tool for SetDueDateTool {
    fn name(&self) -> ToolName {
        ToolName::SetDueDate
    }

    fn description(&self) -> &'static str {
        "Set a due date for a task"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": TASK_REF_DESCRIPTION
                },
                "due_date": {
                    "type": "string",
                    "description": "Due date in natural language (e.g., 'tomorrow', '2026-01-15', 'next Monday')"
                }
            },
            "required": ["task_id", "due_date"]
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "set due date"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "SetDueDateTool::execute: called");
        let reference = task_ref(input)?;
        let raw = required_str(input, "due_date")?;
        let due = parse_due_date(raw, ctx.now);
        if due.is_none() {
            warn!(due_date = %raw, "SetDueDateTool::execute: unparseable due date, clearing");
        }

        let mut task = resolve(ctx.tasks.as_ref(), &ctx.owner, &reference).await?;
        if task.due_at != due {
            task.reminder_sent = false;
        }
        task.due_at = due;
        task.touch(ctx.now);
        let task = ctx.tasks.update_task(task).await?;

        let message = match due {
            Some(due) => format!("Due date set for task '{}' to {}", task.text, due.format("%Y-%m-%d %H:%M")),
            None => format!(
                "I couldn't read '{}' as a date, so the due date for task '{}' was cleared",
                raw.trim(),
                task.text
            ),
        };
        Ok(json!({
            "task": task_json(&task, ctx.now),
            "due_date": due.map(timestamp),
            "message": message,
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        message_fragment(result)
    }
}
