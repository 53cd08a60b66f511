//! State management with actor pattern
//!
//! StateManager owns the TaskStore and processes messages via channels,
//! providing thread-safe access to persistent state. TurnScope stages a chat
//! turn's task writes until the turn commits; the owner lock keeps concurrent
//! writers from staging against the same base.

mod locks;
mod manager;
mod messages;
mod repository;
mod unit;

pub use locks::{ConversationLocks, KeyedLocks, OwnerLocks};
pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse, TaskChange, TurnCommit};
pub use repository::{TaskRepository, require_task};
pub use unit::TurnScope;
