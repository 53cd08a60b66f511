//! Tool system for chat turns
//!
//! The planner answers a chat message with tool calls; the executor runs them
//! in order against the turn's `ToolContext`, records each one in the ledger
//! and builds the reply from fixed narrative templates.

mod catalog;
mod context;
mod error;
mod executor;
mod traits;

pub mod args;
pub mod builtin;
pub mod dates;
pub mod resolver;

pub use catalog::ToolName;
pub use context::ToolContext;
pub use error::{ReferenceError, ToolError};
pub use executor::{Dispatch, ToolExecutor};
pub use traits::{Tool, ToolResult};
