//! Advisory lease over the shared bucket.
//!
//! ## Protocol
//! 1. Probe the lease object's metadata.
//! 2. Absent: create it with our identity -> `Acquired`.
//! 3. Present and `now - created_at <= threshold`: `HeldByOther`.
//! 4. Present and older: delete it, create ours -> `ReclaimedAndAcquired`.
//!
//! Creation goes through `create_if_absent` and reclamation through `delete_if_unchanged`
//! against the version we observed, both atomic on stores with conditional writes. Of two
//! instances reclaiming the same stale lease, at most one deletes it and at most one creates
//! the replacement.
//!
//! `try_acquire` answers any store error with `HeldByOther`; we never proceed under
//! uncertainty. `try_acquire_checked` hands the error back instead, for callers that route
//! the attempt through a circuit breaker and must see the outage to count it.

use super::types::{InstanceId, LeaseOutcome, LeaseRecord};
use crate::clock::{Clock, system_clock};
use crate::error::SyncError;
use crate::store::ObjectStore;

use std::sync::Arc;
use std::time::Duration;

pub struct LeaseCoordinator {
    store: Arc<dyn ObjectStore>,
    lease_key: String,
    identity: InstanceId,
    clock: Clock,
}

/// A lease is stale only when its age is strictly greater than the threshold.
pub fn is_stale(age_ms: u64, stale_threshold: Duration) -> bool {
    u128::from(age_ms) > stale_threshold.as_millis()
}

impl LeaseCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>, lease_key: &str, identity: InstanceId) -> Self {
        Self {
            store,
            lease_key: lease_key.to_string(),
            identity,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn identity(&self) -> &InstanceId {
        &self.identity
    }

    pub fn lease_key(&self) -> &str {
        &self.lease_key
    }

    pub async fn try_acquire(&self, stale_threshold: Duration) -> LeaseOutcome {
        match self.try_acquire_checked(stale_threshold).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Lease store call failed, backing off: {}", e);
                LeaseOutcome::HeldByOther
            }
        }
    }

    /// Same protocol as `try_acquire`, but a failed store call is returned as the error.
    ///
    /// Losing a race (the lease appeared, or was replaced, between our calls) is not an error
    /// and reads as `HeldByOther`.
    pub async fn try_acquire_checked(
        &self,
        stale_threshold: Duration,
    ) -> Result<LeaseOutcome, SyncError> {
        let Some(metadata) = self.store.stat_metadata(&self.lease_key).await? else {
            return Ok(if self.create().await? {
                tracing::debug!("Acquired lease {} as {}", self.lease_key, self.identity);
                LeaseOutcome::Acquired
            } else {
                LeaseOutcome::HeldByOther
            });
        };

        // Clock skew can put created_at in the future; that reads as a brand new lease.
        let age_ms = (self.clock)().saturating_sub(metadata.created_at);
        if !is_stale(age_ms, stale_threshold) {
            tracing::debug!(
                "Lease {} held by another instance (age {}ms), skipping",
                self.lease_key,
                age_ms
            );
            return Ok(LeaseOutcome::HeldByOther);
        }

        if !self
            .store
            .delete_if_unchanged(&self.lease_key, &metadata)
            .await?
        {
            tracing::debug!("Stale lease {} already replaced, skipping", self.lease_key);
            return Ok(LeaseOutcome::HeldByOther);
        }
        tracing::info!("Cleared stale lease {} (age {}ms)", self.lease_key, age_ms);

        Ok(if self.create().await? {
            LeaseOutcome::ReclaimedAndAcquired
        } else {
            LeaseOutcome::HeldByOther
        })
    }

    /// Acquires and wraps the lease in a guard that releases it on every exit path.
    pub async fn acquire_scoped(
        self: &Arc<Self>,
        stale_threshold: Duration,
    ) -> Result<(LeaseOutcome, Option<LeaseGuard>), SyncError> {
        let outcome = self.try_acquire_checked(stale_threshold).await?;
        let guard = outcome.is_acquired().then(|| LeaseGuard {
            coordinator: Some(self.clone()),
        });
        Ok((outcome, guard))
    }

    /// Deletes the lease if it is still ours. Failures are logged and otherwise ignored;
    /// an unreleased lease simply goes stale.
    pub async fn release(&self) {
        match self.store.get_object(&self.lease_key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<LeaseRecord>(&bytes) {
                Ok(record) if record.holder == self.identity => {}
                Ok(record) => {
                    tracing::debug!("Lease now held by {}, leaving it", record.holder);
                    return;
                }
                Err(_) => {
                    tracing::debug!("Lease written by a foreign client, leaving it");
                    return;
                }
            },
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Failed to read lease before release: {}", e);
                return;
            }
        }

        match self.store.delete_object(&self.lease_key).await {
            Ok(()) => tracing::debug!("Released lease {}", self.lease_key),
            Err(e) => tracing::warn!("Failed to release lease: {}", e),
        }
    }

    async fn create(&self) -> Result<bool, SyncError> {
        let record = LeaseRecord {
            holder: self.identity.clone(),
            created_at: (self.clock)(),
            pid: std::process::id(),
        };
        let bytes = serde_json::to_vec(&record)?;

        let created = self.store.create_if_absent(&self.lease_key, bytes).await?;
        if !created {
            tracing::debug!("Lost the race to create lease {}", self.lease_key);
        }
        Ok(created)
    }
}

/// Releases the lease when dropped, including when the owning future is cancelled.
///
/// Prefer `release().await` on the normal path; the drop path has to spawn the release onto
/// the current runtime and cannot wait for it.
pub struct LeaseGuard {
    coordinator: Option<Arc<LeaseCoordinator>>,
}

impl LeaseGuard {
    pub async fn release(mut self) {
        if let Some(coordinator) = self.coordinator.take() {
            coordinator.release().await;
        }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        let Some(coordinator) = self.coordinator.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    coordinator.release().await;
                });
            }
            Err(_) => {
                tracing::warn!("Lease guard dropped outside a runtime; lease will go stale");
            }
        }
    }
}
