//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the monitor's workflows. Each use case owns its state; nothing
//! is shared between them except the ports they are handed.
//!
//! Use cases:
//! - `BalanceMonitor`: Balance polling and diffing
//! - `TransactionMonitor`: Transaction polling and subscription processing
//! - `Scheduler`: Fixed-interval, non-overlapping cycle driver

pub mod balance_monitor;
pub mod report;
pub mod scheduler;
pub mod transaction_monitor;

pub use balance_monitor::BalanceMonitor;
pub use report::CycleReport;
pub use scheduler::{HealthRefresher, PollCycle, Scheduler};
pub use transaction_monitor::{PollingLimits, SignatureOutcome, TransactionMonitor};
