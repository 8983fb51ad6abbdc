use crate::feed::CandidateItem;

use rand::Rng;
use serde::Serialize;
use std::time::Duration;

/// Result of one `fetch_new_items` cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchOutcome {
    /// New items not yet acted upon by this instance, in document order.
    pub items: Vec<CandidateItem>,
    /// Another instance holds the lease; nothing was fetched.
    pub skipped_due_to_lease: bool,
    /// A cycle was already running in this instance; nothing was done.
    pub already_running: bool,
    /// The document changed since the last successful fetch.
    pub changed: bool,
    /// The lease was taken over from a stale holder.
    pub reclaimed_lease: bool,
    /// The store's version after this cycle, if the document exists.
    pub version: Option<String>,
}

impl FetchOutcome {
    pub fn skipped_due_to_lease() -> Self {
        Self {
            skipped_due_to_lease: true,
            ..Self::default()
        }
    }

    pub fn already_running() -> Self {
        Self {
            already_running: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Completed,
    Failed(FailureReason),
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed)
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ActionOutcome::Failed(FailureReason::CircuitOpen { .. }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The posting breaker refused the call. Try again after `retry_after`.
    CircuitOpen { retry_after: Duration },
    /// The target could not be reached or timed out.
    Remote(String),
    /// The target was reached and declined.
    Rejected(String),
    /// This instance already acted on the item.
    AlreadyProcessed,
}

/// Reported after each batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub current_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchItemResult {
    pub id: String,
    pub outcome: ActionOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// One entry per attempted item, in processing order.
    pub results: Vec<BatchItemResult>,
    /// Ids left untouched because the batch stopped early.
    pub not_attempted: Vec<String>,
    /// The posting breaker opened and cut the batch short.
    pub stopped_by_breaker: bool,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome.is_completed())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.completed()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("a batch is already being processed")]
    AlreadyProcessing,
}

/// Pause inserted between consecutive batch items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl DelayPolicy {
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Uniformly random duration in `[min, max]`.
    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if max <= min {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), Duration::from_secs(45))
    }
}
