//! Complete task tool - marks a task done and reschedules recurring ones

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::domain::next_occurrence;
use crate::tools::args::task_ref;
use crate::tools::resolver::resolve;
use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{TASK_REF_DESCRIPTION, message_fragment, task_json};

/// Mark a task complete
///
/// Completing a recurring task stages its successor. Completing a task that
/// is already done changes nothing and spawns nothing.
pub struct CompleteTaskTool;

#[async_trait]
impl Tool for CompleteTaskTool {
    fn name(&self) -> ToolName {
        ToolName::CompleteTask
    }

    fn description(&self) -> &'static str {
        "Mark a task as complete"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": TASK_REF_DESCRIPTION
                }
            },
            "required": ["task_id"]
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "complete that task"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "CompleteTaskTool::execute: called");
        let mut task = resolve(ctx.tasks.as_ref(), &ctx.owner, &task_ref(input)?).await?;

        if task.completed {
            debug!(task_id = %task.id, "CompleteTaskTool::execute: already completed");
            return Ok(json!({
                "task": task_json(&task, ctx.now),
                "already_completed": true,
                "message": format!("Task '{}' is already complete", task.text),
            }));
        }

        task.completed = true;
        task.touch(ctx.now);
        let task = ctx.tasks.update_task(task).await?;
        let mut message = format!("Task '{}' marked as complete", task.text);

        let next = match next_occurrence(&task, ctx.now) {
            Some(successor) => {
                let successor = ctx.tasks.create_task(successor).await?;
                info!(
                    task_id = %task.id,
                    next_task_id = %successor.id,
                    recurrence = %task.recurrence,
                    "Recurring task rescheduled"
                );
                match successor.due_at {
                    Some(due) => message.push_str(&format!(" and rescheduled for {}", due.format("%Y-%m-%d"))),
                    None => message.push_str(" and rescheduled for next occurrence"),
                }
                Some(task_json(&successor, ctx.now))
            }
            None => None,
        };

        Ok(json!({
            "task": task_json(&task, ctx.now),
            "already_completed": false,
            "next_task": next,
            "message": message,
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        message_fragment(result)
    }
}
