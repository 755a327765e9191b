//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP JSON-RPC, WebSockets, file I/O). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `rpc`: Solana JSON-RPC client and the resilience stack around it
//! - `feeds`: `logsSubscribe` WebSocket feed
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: JSON/JSONL event store and watch snapshot loader

pub mod feeds;
pub mod metrics;
pub mod persistence;
pub mod rpc;
