//! Domain types for TaskChat
//!
//! Core records: Task, Conversation, ChatMessage.
//! All implement the Record trait for TaskStore persistence.

mod conversation;
mod id;
mod ledger;
mod priority;
mod recurrence;
mod task;

pub use conversation::{ChatMessage, Conversation, MessageRole};
pub use id::{ConversationId, IdError, MessageId, TaskId, generate_id};
pub use ledger::{ToolInvocation, ToolResult};
pub use priority::Priority;
pub use recurrence::{Recurrence, next_occurrence};
pub use task::{MAX_DIRECT_TEXT, MAX_TASK_TEXT, Origin, Task, TextError, validate_text};

// Re-export taskstore types for convenience
pub use taskstore::{Filter, FilterOp, IndexValue, Record, Store};
