//! ToolExecutor - dispatches a turn's tool calls in order

use std::collections::HashMap;

use tracing::{debug, error, warn};

use crate::domain::ToolInvocation;
use crate::llm::{ToolCall, ToolDefinition};

use super::{Tool, ToolContext, ToolError, ToolName, ToolResult};

/// Outcome of dispatching one turn's calls
#[derive(Debug, Clone, Default)]
pub struct Dispatch {
    /// Ledger entries in execution order
    pub invocations: Vec<ToolInvocation>,

    /// Concatenated reply fragments
    pub narrative: String,
}

/// Holds the tool handlers and runs planner calls against them
pub struct ToolExecutor {
    tools: HashMap<ToolName, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Create executor with every catalog tool
    pub fn standard() -> Self {
        debug!("ToolExecutor::standard: called");
        let tools = ToolName::ALL.into_iter().map(|name| (name, name.handler())).collect();
        Self { tools }
    }

    /// Tool definitions for the planner, in catalog order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        debug!("ToolExecutor::definitions: called");
        ToolName::ALL
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| ToolDefinition::new(t.name().as_str(), t.description(), t.input_schema()))
            .collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        name.parse::<ToolName>().is_ok_and(|name| self.tools.contains_key(&name))
    }

    /// Execute one call, producing its ledger entry and reply fragment
    ///
    /// Only infrastructure failures are returned as errors; everything else
    /// is recorded as a failed invocation.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<(ToolInvocation, String), ToolError> {
        debug!(tool_name = %call.name, tool_id = %call.id, "ToolExecutor::execute: called");
        let tool = call.name.parse::<ToolName>().ok().and_then(|name| self.tools.get(&name));

        let Some(tool) = tool else {
            warn!(tool_name = %call.name, "ToolExecutor::execute: unknown tool");
            let err = ToolError::UnknownTool(call.name.clone());
            let fragment = format!("Sorry, I couldn't do that: {}. ", err);
            return Ok((ledger_entry(call, ToolResult::error(err.to_string())), fragment));
        };

        match tool.execute(&call.input, ctx).await {
            Ok(payload) => {
                let result = ToolResult::success(payload);
                let fragment = tool.narrate(&result);
                Ok((ledger_entry(call, result), fragment))
            }
            Err(err) if err.is_fatal() => {
                error!(tool_name = %call.name, error = %err, "ToolExecutor::execute: fatal tool failure");
                Err(err)
            }
            Err(err) => {
                debug!(tool_name = %call.name, error = %err, "ToolExecutor::execute: tool failed");
                let fragment = format!("Sorry, I couldn't {}: {}. ", tool.failure_phrase(), err);
                Ok((ledger_entry(call, ToolResult::error(err.to_string())), fragment))
            }
        }
    }

    /// Execute calls strictly in order
    ///
    /// A failed call never stops the calls after it; a fatal error stops the
    /// whole dispatch and its staged writes must be discarded.
    pub async fn dispatch(&self, calls: &[ToolCall], ctx: &ToolContext) -> Result<Dispatch, ToolError> {
        debug!(count = calls.len(), "ToolExecutor::dispatch: called");
        let mut dispatch = Dispatch::default();

        for call in calls {
            let (invocation, fragment) = self.execute(call, ctx).await?;
            dispatch.invocations.push(invocation);
            dispatch.narrative.push_str(&fragment);
        }

        debug!(
            succeeded = dispatch.invocations.iter().filter(|i| i.result.success).count(),
            "ToolExecutor::dispatch: completed all calls"
        );
        Ok(dispatch)
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::standard()
    }
}

fn ledger_entry(call: &ToolCall, result: ToolResult) -> ToolInvocation {
    ToolInvocation {
        function: call.name.clone(),
        args: call.input.clone(),
        result,
    }
}
