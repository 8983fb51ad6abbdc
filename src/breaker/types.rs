use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Tuning for one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures that open the breaker.
    pub threshold: u32,
    /// Upper bound on a single wrapped call.
    pub timeout: Duration,
    /// How long the breaker stays open before admitting a trial call.
    pub reset_timeout: Duration,
}

impl BreakerSettings {
    pub const fn new(threshold: u32, timeout: Duration, reset_timeout: Duration) -> Self {
        Self {
            threshold,
            timeout,
            reset_timeout,
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60), Duration::from_secs(300))
    }
}

/// The remote dependencies that get their own breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyClass {
    /// The shared bucket.
    Storage,
    /// The upstream text generation service.
    Generation,
    /// The external posting target.
    Posting,
}

impl DependencyClass {
    pub const ALL: [DependencyClass; 3] = [
        DependencyClass::Storage,
        DependencyClass::Generation,
        DependencyClass::Posting,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DependencyClass::Storage => "storage",
            DependencyClass::Generation => "generation",
            DependencyClass::Posting => "posting",
        }
    }

    /// Accepts the canonical names plus the legacy aliases older clients report
    /// (`gcs`, `gemini`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "storage" | "gcs" => Some(DependencyClass::Storage),
            "generation" | "gemini" => Some(DependencyClass::Generation),
            "posting" => Some(DependencyClass::Posting),
            _ => None,
        }
    }

    pub fn default_settings(&self) -> BreakerSettings {
        match self {
            DependencyClass::Storage => {
                BreakerSettings::new(5, Duration::from_secs(30), Duration::from_secs(300))
            }
            DependencyClass::Generation => {
                BreakerSettings::new(3, Duration::from_secs(60), Duration::from_secs(600))
            }
            DependencyClass::Posting => {
                BreakerSettings::new(3, Duration::from_secs(45), Duration::from_secs(300))
            }
        }
    }
}

impl fmt::Display for DependencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point-in-time view of a breaker for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: BreakerState,
    pub failure_count: u32,
    pub threshold: u32,
    /// Milliseconds until an open breaker admits a trial call.
    pub retry_after_ms: Option<u64>,
    /// Epoch milliseconds of the most recent failure.
    pub last_failure_at: Option<u64>,
}
