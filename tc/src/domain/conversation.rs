//! Conversations and their messages

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ConversationId, IndexValue, MessageId, Record, ToolInvocation};

/// A chat thread owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(owner: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::generate(),
            owner: owner.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance `updated_at`; never moves it backwards
    pub fn bump(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

impl Record for Conversation {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at.timestamp_millis()
    }

    fn collection_name() -> &'static str {
        "conversations"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("owner".to_string(), IndexValue::String(self.owner.clone()));
        fields
    }
}

/// Author of a persisted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A persisted chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub owner: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(conversation: &Conversation, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id: conversation.id.clone(),
            owner: conversation.owner.clone(),
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            created_at: now,
        }
    }

    /// Assistant reply stamped strictly after the message it answers
    pub fn assistant_reply(
        prompt: &ChatMessage,
        content: impl Into<String>,
        tool_calls: Vec<ToolInvocation>,
        now: DateTime<Utc>,
    ) -> Self {
        let floor = prompt.created_at + Duration::milliseconds(1);
        Self {
            id: MessageId::generate(),
            conversation_id: prompt.conversation_id.clone(),
            owner: prompt.owner.clone(),
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            created_at: now.max(floor),
        }
    }
}

impl Record for ChatMessage {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn updated_at(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    fn collection_name() -> &'static str {
        "messages"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert(
            "conversation_id".to_string(),
            IndexValue::String(self.conversation_id.to_string()),
        );
        fields.insert("owner".to_string(), IndexValue::String(self.owner.clone()));
        fields.insert("role".to_string(), IndexValue::String(self.role.to_string()));
        fields
    }
}
