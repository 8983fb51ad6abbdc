//! Error Taxonomy
//!
//! Errors the coordination layer hands back to its callers. "Not found" is never
//! an error here (it is modelled as `Option::None`), and lease contention is a
//! `LeaseOutcome`, not a failure.

use std::time::Duration;

/// Failures surfaced by the coordination and resilience layer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The store or the action target was unreachable or answered with a non-success status.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The breaker guarding `breaker` is open; the caller should try again later.
    #[error("circuit breaker '{breaker}' is open, retry in {}s", retry_after.as_secs())]
    CircuitOpen {
        breaker: String,
        retry_after: Duration,
    },

    /// The wrapped call did not finish within the breaker's per-call timeout.
    #[error("call through '{breaker}' timed out after {}ms", after.as_millis())]
    Timeout { breaker: String, after: Duration },

    /// The shared document (or another stored object) could not be decoded.
    #[error("failed to decode stored object: {0}")]
    Decode(#[from] serde_json::Error),

    /// A durable local write failed. In-memory state is still up to date.
    #[error("local persistence failed: {0}")]
    PersistenceFailure(String),
}

impl SyncError {
    /// True for the breaker's "try again later" signal.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, SyncError::CircuitOpen { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SyncError::CircuitOpen { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::RemoteUnavailable(err.to_string())
    }
}
