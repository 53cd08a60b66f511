//! Add tags tool

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::tools::args::{string_list, task_ref};
use crate::tools::resolver::resolve;
use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{TASK_REF_DESCRIPTION, message_fragment, task_json};

/// Union tags into a task's tag set
pub struct AddTagsTool;

#[async_trait]
impl Tool for AddTagsTool {
    fn name(&self) -> ToolName {
        ToolName::AddTags
    }

    fn description(&self) -> &'static str {
        "Add tags/categories to a task"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": TASK_REF_DESCRIPTION
                },
                "tags": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of tags to add"
                }
            },
            "required": ["task_id", "tags"]
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "add tags"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "AddTagsTool::execute: called");
        let reference = task_ref(input)?;
        let tags = string_list(input, "tags");
        if tags.is_empty() {
            return Err(ToolError::validation("At least one tag is required"));
        }

        let mut task = resolve(ctx.tasks.as_ref(), &ctx.owner, &reference).await?;
        task.add_tags(&tags);
        task.touch(ctx.now);
        let task = ctx.tasks.update_task(task).await?;

        Ok(json!({
            "task": task_json(&task, ctx.now),
            "message": format!("Tags added to task '{}': {}", task.text, tags.join(", ")),
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        message_fragment(result)
    }
}
