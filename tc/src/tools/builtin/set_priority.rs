//! Set priority tool

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::Priority;
use crate::tools::args::{required_str, task_ref};
use crate::tools::resolver::resolve;
use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{TASK_REF_DESCRIPTION, message_fragment, task_json};

/// Set a task's priority; unlike `add_task`, bad values are rejected
pub struct SetPriorityTool;

#[async_trait]
impl Tool for SetPriorityTool {
    fn name(&self) -> ToolName {
        ToolName::SetPriority
    }

    fn description(&self) -> &'static str {
        "Set the priority level for a task"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": TASK_REF_DESCRIPTION
                },
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "description": "Priority level to set"
                }
            },
            "required": ["task_id", "priority"]
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "set priority"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "SetPriorityTool::execute: called");
        let reference = task_ref(input)?;
        let priority: Priority = required_str(input, "priority")?
            .parse()
            .map_err(|_| ToolError::validation("Priority must be low, medium, or high"))?;

        let mut task = resolve(ctx.tasks.as_ref(), &ctx.owner, &reference).await?;
        task.priority = priority;
        task.touch(ctx.now);
        let task = ctx.tasks.update_task(task).await?;

        Ok(json!({
            "task": task_json(&task, ctx.now),
            "message": format!("Task '{}' priority set to {}", task.text, priority),
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        message_fragment(result)
    }
}
