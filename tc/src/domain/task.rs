//! Task record

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ConversationId, IndexValue, Priority, Record, Recurrence, TaskId};

/// Longest task text accepted anywhere
pub const MAX_TASK_TEXT: usize = 500;

/// Longest task text accepted through the direct CRUD path
pub const MAX_DIRECT_TEXT: usize = 200;

/// Rejections for task text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    #[error("task text cannot be empty")]
    Empty,

    #[error("task text must be {max} characters or less (got {len})")]
    TooLong { max: usize, len: usize },

    #[error("task text cannot contain control characters")]
    ControlCharacter,
}

/// Trim and validate task text against a length limit
pub fn validate_text(text: &str, max: usize) -> Result<String, TextError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TextError::Empty);
    }
    let len = text.chars().count();
    if len > max {
        return Err(TextError::TooLong { max, len });
    }
    if text.chars().any(|c| (c as u32) < 0x20) {
        return Err(TextError::ControlCharacter);
    }
    Ok(text.to_string())
}

/// Which surface created a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    #[default]
    Chat,
    DirectApi,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::DirectApi => write!(f, "direct-api"),
        }
    }
}

/// A single todo item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner: String,
    pub text: String,
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub origin: Origin,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
}

impl Task {
    /// Create an incomplete task with default attributes
    ///
    /// `text` is expected to be validated already.
    pub fn new(owner: impl Into<String>, text: impl Into<String>, origin: Origin, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::generate(),
            owner: owner.into(),
            text: text.into(),
            completed: false,
            priority: Priority::default(),
            tags: BTreeSet::new(),
            due_at: None,
            recurrence: Recurrence::None,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
            origin,
            conversation_id: None,
        }
    }

    /// Union `tags` into the tag set, ignoring blanks
    pub fn add_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() {
                self.tags.insert(tag.to_string());
            }
        }
    }

    /// Overdue means incomplete with a due date strictly in the past
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_at.is_some_and(|due| due < now)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at.timestamp_millis()
    }

    fn collection_name() -> &'static str {
        "tasks"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("owner".to_string(), IndexValue::String(self.owner.clone()));
        fields.insert("completed".to_string(), IndexValue::Bool(self.completed));
        fields.insert("priority".to_string(), IndexValue::String(self.priority.to_string()));
        fields.insert("origin".to_string(), IndexValue::String(self.origin.to_string()));
        if let Some(due) = self.due_at {
            fields.insert("due_at".to_string(), IndexValue::Int(due.timestamp_millis()));
        }
        fields
    }
}
