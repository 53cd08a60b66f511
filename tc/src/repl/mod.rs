//! Interactive REPL for TaskChat
//!
//! Every line typed is one chat turn against the persisted conversation.

mod session;

pub use session::ReplSession;

use std::sync::Arc;

use eyre::Result;

use crate::chat::ChatSession;

/// Run the interactive REPL
///
/// This is the entry point for `tc chat` without a message.
pub async fn run_interactive(
    chat: Arc<ChatSession>,
    owner: &str,
    conversation_id: Option<String>,
) -> Result<()> {
    let mut session = ReplSession::new(chat, owner, conversation_id);
    session.run().await
}
