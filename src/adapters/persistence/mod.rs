//! Persistence Adapters - JSON/JSONL File Storage
//!
//! Implements the EventStore port using an atomic JSON snapshot for
//! latest balances and append-only JSONL files for change events and
//! transaction records. Also loads the startup watch set snapshot.

pub mod balances;
pub mod events;
pub mod repository_impl;
pub mod snapshot;

pub use balances::BalanceSnapshotStore;
pub use events::EventLog;
pub use repository_impl::JsonlEventStore;
pub use snapshot::{load_watch_set, parse_watch_set};
