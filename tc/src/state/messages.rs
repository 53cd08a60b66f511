//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{ChatMessage, Conversation, ConversationId, Task, TaskId};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// A single staged task mutation
#[derive(Debug, Clone, PartialEq)]
pub enum TaskChange {
    Created(Task),
    Updated(Task),
    Deleted(Task),
}

impl TaskChange {
    pub fn task(&self) -> &Task {
        match self {
            Self::Created(task) | Self::Updated(task) | Self::Deleted(task) => task,
        }
    }
}

/// Everything a chat turn writes, committed in one transaction
#[derive(Debug, Clone)]
pub struct TurnCommit {
    pub conversation: Conversation,
    pub messages: Vec<ChatMessage>,
    pub changes: Vec<TaskChange>,
}

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Task operations
    CreateTask {
        task: Task,
        reply: oneshot::Sender<StateResponse<TaskId>>,
    },
    GetTask {
        owner: String,
        id: TaskId,
        reply: oneshot::Sender<StateResponse<Option<Task>>>,
    },
    UpdateTask {
        task: Task,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    DeleteTask {
        owner: String,
        id: TaskId,
        reply: oneshot::Sender<StateResponse<Option<Task>>>,
    },
    ListTasks {
        owner: String,
        reply: oneshot::Sender<StateResponse<Vec<Task>>>,
    },

    // Conversation operations
    GetConversation {
        id: ConversationId,
        reply: oneshot::Sender<StateResponse<Option<Conversation>>>,
    },
    ListConversations {
        owner: String,
        reply: oneshot::Sender<StateResponse<Vec<Conversation>>>,
    },
    ListMessages {
        conversation_id: ConversationId,
        reply: oneshot::Sender<StateResponse<Vec<ChatMessage>>>,
    },

    // Atomic turn commit
    CommitTurn {
        commit: Box<TurnCommit>,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Shutdown
    Shutdown,
}
