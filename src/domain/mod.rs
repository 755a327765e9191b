//! Domain layer - Core monitoring logic and models.
//!
//! Pure state machines and value types for the token holder monitor.
//! No I/O here (hexagonal architecture inner ring); everything is
//! deterministic given its inputs and testable in isolation.

pub mod classifier;
pub mod dedup;
pub mod tracker;
pub mod types;
pub mod venue;

// Re-export core types for convenience
pub use classifier::TransactionClassifier;
pub use dedup::{DEFAULT_DEDUP_CAPACITY, DedupLedger};
pub use tracker::{AddressState, BalanceTracker, DEFAULT_EPSILON, Observation};
pub use types::{
    BalanceChangeEvent, BalanceRecord, Direction, ParsedTransaction, ProgramId, Signature,
    TokenBalanceEntry, TransactionRecord, Venue, WatchEntry, WatchSet, WatchedAddress,
};
pub use venue::{VenueRule, VenueTable};
