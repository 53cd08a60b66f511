//! Tool error types

use thiserror::Error;

use crate::domain::TextError;
use crate::state::StateError;

/// Failures resolving a task reference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("Task not found")]
    NotFound { reference: String },

    #[error("Task position {reference} not found (you have {count} tasks)")]
    OutOfRange { reference: String, count: usize },

    #[error("Invalid task reference: '{0}'")]
    MalformedReference(String),
}

/// Errors that can occur during tool execution
///
/// Everything except `Infrastructure` is recorded against the single
/// invocation and the turn carries on.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Storage failure: {0}")]
    Infrastructure(#[from] StateError),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error must abort the whole turn
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

impl From<TextError> for ToolError {
    fn from(err: TextError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = ToolError::from(ReferenceError::OutOfRange {
            reference: "5".to_string(),
            count: 2,
        });
        assert_eq!(err.to_string(), "Task position 5 not found (you have 2 tasks)");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_only_infrastructure_is_fatal() {
        assert!(ToolError::Infrastructure(StateError::ChannelError).is_fatal());
        assert!(!ToolError::validation("bad").is_fatal());
        assert!(!ToolError::UnknownTool("fly".to_string()).is_fatal());
        assert!(!ToolError::from(TextError::Empty).is_fatal());
    }
}
