//! Recurrence engine
//!
//! Completing a recurring task spawns its successor. The successor's due date
//! is the completed task's due date shifted by the recurrence interval; a
//! task without a due date spawns a successor without one.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Task, TaskId};

/// How often a task repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    /// Offset between occurrences; monthly is a fixed 30 days
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Daily => Some(Duration::days(1)),
            Self::Weekly => Some(Duration::days(7)),
            Self::Monthly => Some(Duration::days(30)),
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Due date of the next occurrence
    pub fn next_due(&self, due: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        match (self.interval(), due) {
            (Some(step), Some(due)) => Some(due + step),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("Unknown recurrence: {}", s)),
        }
    }
}

/// Build the successor of a just-completed recurring task
///
/// Returns `None` for non-recurring tasks.
pub fn next_occurrence(completed: &Task, now: DateTime<Utc>) -> Option<Task> {
    if !completed.recurrence.is_recurring() {
        return None;
    }
    Some(Task {
        id: TaskId::generate(),
        owner: completed.owner.clone(),
        text: completed.text.clone(),
        completed: false,
        priority: completed.priority,
        tags: completed.tags.clone(),
        due_at: completed.recurrence.next_due(completed.due_at),
        recurrence: completed.recurrence,
        reminder_sent: false,
        created_at: now,
        updated_at: now,
        origin: completed.origin,
        conversation_id: completed.conversation_id.clone(),
    })
}
