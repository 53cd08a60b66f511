//! Set recurrence tool

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::Recurrence;
use crate::tools::args::{required_str, task_ref};
use crate::tools::resolver::resolve;
use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{TASK_REF_DESCRIPTION, message_fragment, task_json};

pub struct SetRecurrenceTool;

#[async_trait]
impl Tool for SetRecurrenceTool {
    fn name(&self) -> ToolName {
        ToolName::SetRecurrence
    }

    fn description(&self) -> &'static str {
        "Set or remove the recurrence pattern for a task"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": TASK_REF_DESCRIPTION
                },
                "recurrence": {
                    "type": "string",
                    "enum": ["daily", "weekly", "monthly", "none"],
                    "description": "Recurrence pattern ('none' to remove)"
                }
            },
            "required": ["task_id", "recurrence"]
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "set recurrence"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "SetRecurrenceTool::execute: called");
        let reference = task_ref(input)?;
        let recurrence: Recurrence = required_str(input, "recurrence")?
            .parse()
            .map_err(|_| ToolError::validation("Invalid recurrence. Must be one of: daily, weekly, monthly, none"))?;

        let mut task = resolve(ctx.tasks.as_ref(), &ctx.owner, &reference).await?;
        task.recurrence = recurrence;
        task.touch(ctx.now);
        let task = ctx.tasks.update_task(task).await?;

        let message = if recurrence.is_recurring() {
            format!("Task '{}' set to recur {}", task.text, recurrence)
        } else {
            format!("Recurrence removed from task '{}'", task.text)
        };
        Ok(json!({
            "task": task_json(&task, ctx.now),
            "message": message,
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        message_fragment(result)
    }
}
