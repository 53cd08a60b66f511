//! Update task tool - replaces a task's text

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{MAX_TASK_TEXT, validate_text};
use crate::tools::args::{required_str, task_ref};
use crate::tools::resolver::resolve;
use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{TASK_REF_DESCRIPTION, message_fragment, task_json};

pub struct UpdateTaskTool;

#[async_trait]
impl Tool for UpdateTaskTool {
    fn name(&self) -> ToolName {
        ToolName::UpdateTask
    }

    fn description(&self) -> &'static str {
        "Update the text of an existing task"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": TASK_REF_DESCRIPTION
                },
                "new_text": {
                    "type": "string",
                    "description": "The new text for the task"
                }
            },
            "required": ["task_id", "new_text"]
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "update that task"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "UpdateTaskTool::execute: called");
        let reference = task_ref(input)?;
        let new_text = validate_text(required_str(input, "new_text")?, MAX_TASK_TEXT)?;
        let mut task = resolve(ctx.tasks.as_ref(), &ctx.owner, &reference).await?;

        let old_text = std::mem::replace(&mut task.text, new_text);
        task.touch(ctx.now);
        let task = ctx.tasks.update_task(task).await?;

        Ok(json!({
            "task": task_json(&task, ctx.now),
            "old_text": old_text,
            "message": format!("Task updated from '{}' to '{}'", old_text, task.text),
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        message_fragment(result)
    }
}
