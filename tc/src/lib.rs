//! TaskChat - conversational todo manager
//!
//! A user manages their todo list either through direct CRUD calls or through
//! free-form chat turns. A planner turns each chat message into structured
//! tool calls; TaskChat runs them in order against a staged snapshot of the
//! user's tasks, resolves position references like "task 2" through a
//! persisted tool ledger, evolves recurring tasks, and commits the whole turn
//! atomically.
//!
//! # Modules
//!
//! - [`chat`] - Conversation session, context builder and turn locks
//! - [`tools`] - Tool catalog, dispatcher and ordinal resolver
//! - [`domain`] - Task, Conversation, ChatMessage and the tool ledger
//! - [`state`] - StateManager actor and staged turn scope
//! - [`llm`] - Planner client trait and OpenAI implementation
//! - [`notify`] - Per-owner change notifications
//! - [`service`] - Direct CRUD path
//! - [`prompts`] - Planner system prompt templates
//! - [`config`] - Configuration types and loading
//! - [`cli`] / [`repl`] - Command-line interface

pub mod chat;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod notify;
pub mod prompts;
pub mod repl;
pub mod service;
pub mod state;
pub mod tools;

// Re-export commonly used types
pub use chat::{ChatSession, TurnError, TurnRequest, TurnResponse};
pub use config::{Config, LlmConfig};
pub use domain::{ChatMessage, Conversation, Priority, Recurrence, Task, TaskId, ToolInvocation, ToolResult};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient};
pub use notify::{Notification, NotificationKind, Notifier};
pub use service::{ServiceError, TaskService, TaskUpdate};
pub use state::{StateError, StateManager, TaskRepository, TurnScope};
pub use tools::{Tool, ToolContext, ToolError, ToolExecutor, ToolName};
