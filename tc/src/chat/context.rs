//! Context builder
//!
//! Turns the persisted message log into planner input: the last K messages
//! plus a reference ledger that maps the positions of the most recent task
//! listing to task IDs. The ledger is rebuilt every turn and never stored.

use tracing::debug;

use crate::domain::{ChatMessage, MessageRole, TaskId};
use crate::llm::Message;

/// Header of the synthetic reference entry
pub const REFERENCE_HEADER: &str = "[Tool Results Reference - Use these IDs for operations]";

/// Builds bounded planner history
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    limit: usize,
}

impl ContextBuilder {
    pub fn new(limit: usize) -> Self {
        Self { limit: limit.max(1) }
    }

    /// Planner messages for a conversation's log (oldest first)
    ///
    /// The window is the last `limit` messages in order. When any listing
    /// exists in the log, even outside the window, a system entry with its
    /// position-to-ID mapping follows the window.
    pub fn build(&self, history: &[ChatMessage]) -> Vec<Message> {
        let start = history.len().saturating_sub(self.limit);
        debug!(
            total = history.len(),
            window = history.len() - start,
            "ContextBuilder::build: called"
        );

        let mut messages: Vec<Message> = history[start..]
            .iter()
            .map(|m| match m.role {
                MessageRole::User => Message::user(&m.content),
                MessageRole::Assistant => Message::assistant(&m.content),
            })
            .collect();

        if let Some(reference) = reference_ledger(history) {
            messages.push(Message::system(reference));
        }
        messages
    }
}

/// IDs of the last list-like result in the log, in listed order
///
/// Scans newest message first and, within a message, the last qualifying
/// ledger entry first.
pub fn last_listing(history: &[ChatMessage]) -> Option<Vec<TaskId>> {
    history
        .iter()
        .rev()
        .filter(|m| m.role == MessageRole::Assistant)
        .find_map(|m| m.tool_calls.iter().rev().find_map(|call| call.result.listed_task_ids()))
}

/// Text of the reference entry, if any listing exists
pub fn reference_ledger(history: &[ChatMessage]) -> Option<String> {
    let ids = last_listing(history)?;
    let mut text = REFERENCE_HEADER.to_string();
    if ids.is_empty() {
        text.push_str("\nThe last listing had no tasks");
    }
    for (i, id) in ids.iter().enumerate() {
        text.push_str(&format!("\nTask {} ID: {}", i + 1, id));
    }
    Some(text)
}
