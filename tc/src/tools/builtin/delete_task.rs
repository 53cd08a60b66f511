//! Delete task tool

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::tools::args::task_ref;
use crate::tools::resolver::resolve;
use crate::tools::{ReferenceError, Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{TASK_REF_DESCRIPTION, message_fragment, task_json};

/// Delete a task permanently
pub struct DeleteTaskTool;

#[async_trait]
impl Tool for DeleteTaskTool {
    fn name(&self) -> ToolName {
        ToolName::DeleteTask
    }

    fn description(&self) -> &'static str {
        "Delete a task permanently"
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
        "delete that task"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "DeleteTaskTool::execute: called");
        let reference = task_ref(input)?;
        let task = resolve(ctx.tasks.as_ref(), &ctx.owner, &reference).await?;

        let deleted = ctx
            .tasks
            .delete_task(&ctx.owner, &task.id)
            .await?
            .ok_or(ReferenceError::NotFound { reference })?;

        Ok(json!({
            "task": task_json(&deleted, ctx.now),
            "message": format!("Task '{}' has been deleted", deleted.text),
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        message_fragment(result)
    }
}
