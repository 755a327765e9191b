//! Solana RPC Adapter
//!
//! Implements `ChainRpc` against a Solana JSON-RPC node and provides the
//! resilience stack every call goes through.
//!
//! Sub-modules:
//! - `client`: reqwest JSON-RPC client (one HTTP request per call)
//! - `gate`: serialized, spaced dispatch
//! - `retry`: bounded retries with rate-limit backoff
//! - `breaker`: consecutive rate-limit circuit breaker
//! - `resilient`: decorator composing the three around any `ChainRpc`
//! - `types`: wire request/response types

pub mod breaker;
pub mod client;
pub mod gate;
pub mod resilient;
pub mod retry;
pub mod types;

pub use breaker::{BreakerState, CircuitBreaker};
pub use client::{SolanaRpcClient, SolanaRpcConfig};
pub use gate::RequestGate;
pub use resilient::ResilientRpc;
pub use retry::RetryPolicy;
