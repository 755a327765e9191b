//! Log Feed Port - Pushed Transaction Notices
//!
//! Subscription form of "new log entries": the feed emits one notice
//! per transaction that touched the monitored token program.

use tokio::sync::broadcast;

/// A transaction seen in the program's log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogNotice {
  /// Transaction signature.
  pub signature: String,
  /// Whether the transaction failed on-chain.
  pub failed: bool,
  /// Slot the notice was produced at.
  pub slot: u64,
}

/// Trait for log notice providers.
///
/// Implementors own their connection and reconnect on their own; a
/// subscriber only sees a stream of notices.
pub trait LogFeed: Send + Sync + 'static {
  /// Subscribe to log notices.
  fn subscribe(&self) -> broadcast::Receiver<LogNotice>;
}
