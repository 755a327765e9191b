//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ChainRpc`: Balance, transaction and signature queries
//! - `LogFeed`: Pushed log notices for the monitored token program
//! - `EventStore`: Balance snapshots, change events, transaction records

pub mod chain_rpc;
pub mod event_store;
pub mod log_feed;

pub use chain_rpc::ChainRpc;
pub use event_store::EventStore;
pub use log_feed::{LogFeed, LogNotice};
