//! ChatSession - processes one chat turn end to end
//!
//! A turn loads (or starts) the conversation, asks the planner for tool
//! calls, dispatches them against a staged `TurnScope`, then commits the user
//! message, every task change, the assistant message and the conversation
//! timestamp in a single store transaction. Notifications go out only after
//! that commit succeeds.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{ChatMessage, Conversation, ConversationId, ToolInvocation};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message, ToolCall};
use crate::notify::Notifier;
use crate::prompts::{PromptContext, PromptLoader};
use crate::state::{ConversationLocks, StateError, StateManager, TaskChange, TurnCommit, TurnScope};
use crate::tools::{ToolContext, ToolError, ToolExecutor};

use super::ContextBuilder;

/// Reply used when the planner does not answer in time
pub const TIMEOUT_REPLY: &str =
    "Sorry, that took me too long to work out and nothing was changed. Could you try again or rephrase?";

/// Reply used when the planner returns neither text nor tool calls
pub const FALLBACK_REPLY: &str = "I'm sorry, I didn't understand that. Could you rephrase?";

/// Errors that fail a whole turn; nothing is committed
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Planner error: {0}")]
    Planner(#[from] LlmError),

    #[error("Storage failure: {0}")]
    State(#[from] StateError),

    #[error("Tool dispatch failed: {0}")]
    Dispatch(ToolError),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl From<ToolError> for TurnError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Infrastructure(e) => Self::State(e),
            ToolError::Validation(_) | ToolError::Reference(_) | ToolError::UnknownTool(_) => Self::Dispatch(err),
        }
    }
}

/// What the planner asked for
enum Plan {
    Reply(String),
    Calls(Vec<ToolCall>),
}

/// Incoming chat message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    /// Continue this conversation; a new one is started when absent
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub message: String,
}

impl TurnRequest {
    pub fn new(conversation_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id,
            message: message.into(),
        }
    }
}

/// Result of a committed turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub conversation_id: ConversationId,
    pub message: String,
    pub tool_calls: Vec<ToolInvocation>,
    pub created_at: DateTime<Utc>,
}

/// Conversation session service
pub struct ChatSession {
    state: StateManager,
    planner: Arc<dyn LlmClient>,
    notifier: Arc<Notifier>,
    executor: ToolExecutor,
    prompts: PromptLoader,
    context: ContextBuilder,
    locks: ConversationLocks,
    planner_timeout: Duration,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl ChatSession {
    pub fn new(state: StateManager, planner: Arc<dyn LlmClient>, notifier: Arc<Notifier>, config: &Config) -> Self {
        debug!(
            context_limit = config.chat.context_message_limit,
            planner_timeout_ms = config.chat.planner_timeout_ms,
            "ChatSession::new: called"
        );
        Self {
            state,
            planner,
            notifier,
            executor: ToolExecutor::standard(),
            prompts: PromptLoader::new(config.chat.prompts_dir.as_deref()),
            context: ContextBuilder::new(config.chat.context_message_limit),
            locks: ConversationLocks::new(),
            planner_timeout: Duration::from_millis(config.chat.planner_timeout_ms),
            max_tokens: config.llm.max_tokens,
            temperature: Some(config.llm.temperature),
        }
    }

    /// Replace the prompt loader (tests use the embedded prompts only)
    pub fn with_prompts(mut self, prompts: PromptLoader) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Process one chat turn for `owner`
    pub async fn process_turn(&self, owner: &str, request: TurnRequest) -> Result<TurnResponse, TurnError> {
        debug!(%owner, conversation_id = ?request.conversation_id, "process_turn: called");
        let text = request.message.trim();
        if text.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let conversation_id = match request.conversation_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                Some(ConversationId::parse(raw).map_err(|_| TurnError::ConversationNotFound(raw.to_string()))?)
            }
            _ => None,
        };

        // Turns on one conversation run one at a time; the log is read under the lock
        let (mut conversation, history, _turn) = match conversation_id {
            Some(id) => {
                let guard = self.locks.acquire(&id).await;
                let conversation = self.owned_conversation(owner, &id).await?;
                let history = self.state.list_messages(&id).await?;
                (conversation, history, guard)
            }
            None => {
                let conversation = Conversation::new(owner, Utc::now());
                let guard = self.locks.acquire(&conversation.id).await;
                (conversation, Vec::new(), guard)
            }
        };

        let now = Utc::now();
        let stamp = history
            .last()
            .map(|last| now.max(last.created_at + ChronoDuration::milliseconds(1)))
            .unwrap_or(now);
        let user_message = ChatMessage::user(&conversation, text, stamp);

        let plan = self.plan(owner, &conversation, &history, text, stamp).await?;

        // Task writes for one owner are serialized from the first read to the commit
        let _tasks = self.state.lock_owner(owner).await;
        let (reply, invocations, changes) = match plan {
            Plan::Reply(reply) => (reply, Vec::new(), Vec::new()),
            Plan::Calls(calls) => self.dispatch(owner, &conversation, &calls, stamp).await?,
        };

        let assistant = ChatMessage::assistant_reply(&user_message, reply, invocations, Utc::now());
        conversation.bump(assistant.created_at);

        self.state
            .commit_turn(TurnCommit {
                conversation: conversation.clone(),
                messages: vec![user_message, assistant.clone()],
                changes: changes.clone(),
            })
            .await?;

        self.notifier.publish_changes(owner, &changes);
        info!(
            %owner,
            conversation_id = %conversation.id,
            tool_calls = assistant.tool_calls.len(),
            changes = changes.len(),
            "Chat turn committed"
        );

        Ok(TurnResponse {
            conversation_id: conversation.id,
            message: assistant.content,
            tool_calls: assistant.tool_calls,
            created_at: assistant.created_at,
        })
    }

    /// Ask the planner for a reply or tool calls
    async fn plan(
        &self,
        owner: &str,
        conversation: &Conversation,
        history: &[ChatMessage],
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Plan, TurnError> {
        let mut messages = self.context.build(history);
        messages.push(Message::user(text));

        let definitions = self.executor.definitions();
        let system_prompt = self
            .prompts
            .assistant_prompt(&PromptContext::new(owner, now, &definitions))
            .map_err(|e| TurnError::Prompt(e.to_string()))?;

        let request = CompletionRequest {
            system_prompt,
            messages,
            tools: definitions,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = match tokio::time::timeout(self.planner_timeout, self.planner.complete(request)).await {
            Ok(response) => response?,
            Err(_) => {
                warn!(
                    conversation_id = %conversation.id,
                    timeout_ms = self.planner_timeout.as_millis() as u64,
                    "Planner timed out, replying with clarification"
                );
                return Ok(Plan::Reply(TIMEOUT_REPLY.to_string()));
            }
        };

        if !response.tool_calls.is_empty() {
            return Ok(Plan::Calls(response.tool_calls));
        }
        let reply = response
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());
        Ok(Plan::Reply(reply))
    }

    /// Run the planner's calls against a staged scope; the caller holds the owner lock
    async fn dispatch(
        &self,
        owner: &str,
        conversation: &Conversation,
        calls: &[ToolCall],
        now: DateTime<Utc>,
    ) -> Result<(String, Vec<ToolInvocation>, Vec<TaskChange>), TurnError> {
        let scope = Arc::new(TurnScope::new(self.state.clone()));
        let ctx = ToolContext::new(owner, scope.clone(), now).with_conversation(conversation.id.clone());
        let dispatch = self.executor.dispatch(calls, &ctx).await?;
        let changes = scope.changes().await;

        Ok((dispatch.narrative.trim().to_string(), dispatch.invocations, changes))
    }

    async fn owned_conversation(&self, owner: &str, id: &ConversationId) -> Result<Conversation, TurnError> {
        owned_conversation(&self.state, owner, id).await
    }

    /// A conversation's messages, oldest first, with their ledgers
    pub async fn history(&self, owner: &str, conversation_id: &str) -> Result<Vec<ChatMessage>, TurnError> {
        history(&self.state, owner, conversation_id).await
    }

    /// Owner's conversations, most recently active first
    pub async fn conversations(&self, owner: &str) -> Result<Vec<Conversation>, TurnError> {
        conversations(&self.state, owner).await
    }
}

async fn owned_conversation(state: &StateManager, owner: &str, id: &ConversationId) -> Result<Conversation, TurnError> {
    match state.get_conversation(id).await? {
        Some(conversation) if conversation.owner == owner => Ok(conversation),
        _ => Err(TurnError::ConversationNotFound(id.to_string())),
    }
}

/// A conversation's messages, oldest first; other owners' conversations are not found
pub async fn history(state: &StateManager, owner: &str, conversation_id: &str) -> Result<Vec<ChatMessage>, TurnError> {
    debug!(%owner, %conversation_id, "history: called");
    let id = ConversationId::parse(conversation_id.trim())
        .map_err(|_| TurnError::ConversationNotFound(conversation_id.to_string()))?;
    owned_conversation(state, owner, &id).await?;
    Ok(state.list_messages(&id).await?)
}

/// Owner's conversations, most recently active first
pub async fn conversations(state: &StateManager, owner: &str) -> Result<Vec<Conversation>, TurnError> {
    debug!(%owner, "conversations: called");
    let mut conversations = state.list_conversations(owner).await?;
    conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(conversations)
}
