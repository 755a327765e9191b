//! Log Feed Adapters - Pushed Transaction Notices
//!
//! Provides the WebSocket `logsSubscribe` feed used by subscription mode.

pub mod logs_ws;

pub use logs_ws::LogsSubscriptionFeed;
