//! TaskStore - generic persistent record storage
//!
//! Records are stored as JSON documents in SQLite, grouped by collection.
//! Each record exposes a set of indexed fields that can be filtered on
//! without deserializing every document.

mod record;
mod store;

pub use record::{Filter, FilterOp, IndexValue, Record};
pub use store::{Batch, Store};
