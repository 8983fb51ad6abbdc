use crate::error::SyncError;
use crate::feed::CandidateItem;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the action target said about one item.
///
/// `success = false` is an answer, not an outage: the target was reached and declined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl ActionReport {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Performs the per-item side effect. Callers wrap it in the posting breaker.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Transport failures are `Err`; a reachable target that refuses is `Ok` with
    /// `success = false`.
    async fn perform(&self, item: &CandidateItem) -> Result<ActionReport, SyncError>;
}
