//! Tool trait definition

use async_trait::async_trait;
use serde_json::Value;

pub use crate::domain::ToolResult;

use super::{ToolContext, ToolError, ToolName};

/// A task operation the planner can call
#[async_trait]
pub trait Tool: Send + Sync {
    /// Catalog entry this handler serves
    fn name(&self) -> ToolName;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Completes "Sorry, I couldn't ..." when the call fails
    fn failure_phrase(&self) -> &'static str;

    /// Execute the tool, returning the success payload
    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError>;

    /// Reply fragment for a successful result
    fn narrate(&self, result: &ToolResult) -> String;
}
