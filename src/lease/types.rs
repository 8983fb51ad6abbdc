use serde::{Deserialize, Serialize};

/// Identity of one client instance (a phone, a desktop app, a worker process).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct InstanceId(pub String);

impl InstanceId {
    /// Generates a new random UUID v4-based identity.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// A readable identity such as `desktop-app-3f2c...`.
    pub fn named(label: &str) -> Self {
        Self(format!("{}-{}", label, uuid::Uuid::new_v4()))
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of the lease object.
///
/// Staleness is judged from the store's own creation timestamp, not from `created_at`;
/// the body is informational and is used to recognise our own lease on release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaseRecord {
    pub holder: InstanceId,
    /// Timestamp (ms) when the holder wrote the lease.
    pub created_at: u64,
    pub pid: u32,
}

/// Result of a lease acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaseOutcome {
    /// No lease existed; we created one.
    Acquired,
    /// A fresh lease exists, or the store could not be consulted. Skip this cycle.
    HeldByOther,
    /// A stale lease was deleted and replaced by ours.
    ReclaimedAndAcquired,
}

impl LeaseOutcome {
    pub fn is_acquired(&self) -> bool {
        !matches!(self, LeaseOutcome::HeldByOther)
    }
}
