//! ToolContext - execution context for tools

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::ConversationId;
use crate::state::TaskRepository;

/// Execution context for tools - scoped to a single owner and turn
///
/// `tasks` is normally the turn's `TurnScope`, so every handler sees the
/// writes made by earlier calls in the same turn. `now` is fixed for the
/// whole turn.
#[derive(Clone)]
pub struct ToolContext {
    /// Owner every read and write is scoped to
    pub owner: String,

    /// Conversation new tasks are linked to
    pub conversation_id: Option<ConversationId>,

    /// Task storage for this turn
    pub tasks: Arc<dyn TaskRepository>,

    /// Clock reading for the turn
    pub now: DateTime<Utc>,
}

impl ToolContext {
    pub fn new(owner: impl Into<String>, tasks: Arc<dyn TaskRepository>, now: DateTime<Utc>) -> Self {
        let owner = owner.into();
        debug!(%owner, "ToolContext::new: called");
        Self {
            owner,
            conversation_id: None,
            tasks,
            now,
        }
    }

    /// Link tasks created through this context to a conversation
    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }
}
