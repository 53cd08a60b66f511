//! Conversation session
//!
//! Runs chat turns: bounded history plus the reference ledger go to the
//! planner, its tool calls run against a staged scope, and the whole turn is
//! committed at once.

mod context;
mod session;

pub use context::{ContextBuilder, REFERENCE_HEADER, last_listing, reference_ledger};
pub use session::{
    ChatSession, FALLBACK_REPLY, TIMEOUT_REPLY, TurnError, TurnRequest, TurnResponse, conversations, history,
};
