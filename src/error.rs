//! Remote call error taxonomy.
//!
//! Only the RPC seam gets a typed error: the resilience stack has to tell
//! rate limits apart from other transient failures, and both apart from
//! terminal ones. Everything else in the crate uses `anyhow`.

use thiserror::Error;

/// JSON-RPC error codes some providers use for throttling.
const RATE_LIMIT_CODES: [i64; 2] = [-32005, -32429];

#[derive(Debug, Error)]
pub enum RpcError {
    /// Network failure, timeout or 5xx. Retried.
    #[error("Transient RPC failure: {0}")]
    Transient(String),

    /// Explicit throttling signal. Retried with longer backoff and counted
    /// by the circuit breaker.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Breaker is open; no network attempt was made.
    #[error("Circuit breaker open, retry in {remaining_ms}ms")]
    CircuitOpen { remaining_ms: u64 },

    /// Every attempt failed.
    #[error("Exhausted {attempts} attempts, last error: {last}")]
    ExhaustedRetries { attempts: u32, last: Box<RpcError> },

    /// Node answered with a non-throttling JSON-RPC error. Not retried.
    #[error("RPC rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// Response could not be decoded. Not retried.
    #[error("Malformed RPC response: {0}")]
    Decode(String),
}

pub type RpcResult<T> = Result<T, RpcError>;

impl RpcError {
    /// Whether this is a throttling signal. Looks through `ExhaustedRetries`.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::ExhaustedRetries { last, .. } => last.is_rate_limited(),
            _ => false,
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::RateLimited(_) => "rate_limited",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::ExhaustedRetries { .. } => "exhausted",
            Self::Rejected { .. } => "rejected",
            Self::Decode(_) => "decode",
        }
    }

    /// Classify a JSON-RPC error object.
    pub fn from_rpc_error(code: i64, message: &str) -> Self {
        if RATE_LIMIT_CODES.contains(&code) || mentions_throttling(message) {
            Self::RateLimited(format!("code {code}: {message}"))
        } else {
            Self::Rejected {
                code,
                message: message.to_string(),
            }
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 429 || mentions_throttling(body) {
            Self::RateLimited(format!("HTTP {status}"))
        } else if status >= 500 {
            Self::Transient(format!("HTTP {status}: {body}"))
        } else {
            Self::Rejected {
                code: i64::from(status),
                message: body.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::from_status(status.as_u16(), &e.to_string());
        }
        if e.is_decode() {
            return Self::Decode(e.to_string());
        }
        Self::Transient(e.to_string())
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Bare digits are not matched: signatures and paths can contain "429".
fn mentions_throttling(message: &str) -> bool {
    message.to_ascii_lowercase().contains("too many requests")
}
