//! Sync Orchestrator
//!
//! Composes the lease, the change feed, the ledger and the breakers into the two operations
//! client code actually calls.
//!
//! ## `fetch_new_items`
//! 1. Return at once if a cycle is already running in this instance.
//! 2. Everything below runs as a single call through the storage breaker. While it is open
//!    the cycle fails fast with `CircuitOpen` and the store is not touched.
//! 3. Acquire the lease. Someone else holding it means `skipped_due_to_lease`; a store error
//!    fails the cycle (and counts against the breaker) without proceeding.
//! 4. Fetch and drop items the ledger has seen.
//! 5. Remember the new version token, then release the lease.
//!
//! ## `act`
//! Runs the executor through the posting breaker and records the id on success.

use super::types::{ActionOutcome, FailureReason, FetchOutcome};
use crate::action::ActionExecutor;
use crate::breaker::{BreakerRegistry, CircuitBreaker, DependencyClass};
use crate::error::SyncError;
use crate::feed::{CandidateItem, ChangeFeedClient};
use crate::lease::{InstanceId, LeaseCoordinator, LeaseOutcome};
use crate::ledger::IdempotencyLedger;
use crate::persistence::{LAST_VERSION_KEY, LocalPersistence};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct SyncOrchestrator {
    feed: ChangeFeedClient,
    lease: Arc<LeaseCoordinator>,
    ledger: Arc<IdempotencyLedger>,
    executor: Arc<dyn ActionExecutor>,
    persistence: Arc<dyn LocalPersistence>,
    storage_breaker: Arc<CircuitBreaker>,
    posting_breaker: Arc<CircuitBreaker>,
    stale_threshold: Duration,
    cycle_running: AtomicBool,
    last_version: Mutex<Option<String>>,
}

impl SyncOrchestrator {
    pub fn new(
        feed: ChangeFeedClient,
        lease: Arc<LeaseCoordinator>,
        ledger: Arc<IdempotencyLedger>,
        executor: Arc<dyn ActionExecutor>,
        persistence: Arc<dyn LocalPersistence>,
        breakers: &BreakerRegistry,
        stale_threshold: Duration,
    ) -> Arc<Self> {
        let last_version = match persistence.load_token(LAST_VERSION_KEY) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Failed to load last feed version, will refetch: {:#}", e);
                None
            }
        };

        Arc::new(Self {
            feed,
            lease,
            ledger,
            executor,
            persistence,
            storage_breaker: breakers.get(DependencyClass::Storage),
            posting_breaker: breakers.get(DependencyClass::Posting),
            stale_threshold,
            cycle_running: AtomicBool::new(false),
            last_version: Mutex::new(last_version),
        })
    }

    pub fn identity(&self) -> &InstanceId {
        self.lease.identity()
    }

    pub fn ledger(&self) -> &Arc<IdempotencyLedger> {
        &self.ledger
    }

    pub fn last_version(&self) -> Option<String> {
        self.last_version
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_cycle_running(&self) -> bool {
        self.cycle_running.load(Ordering::Acquire)
    }

    pub async fn fetch_new_items(&self) -> Result<FetchOutcome, SyncError> {
        if self
            .cycle_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Sync cycle already running, ignoring trigger");
            return Ok(FetchOutcome::already_running());
        }
        let _running = CycleFlag(&self.cycle_running);

        // Lease, fetch and release run as one storage call: a store outage at any step is one
        // breaker failure, and an open breaker keeps the store untouched.
        self.storage_breaker.call(|| self.leased_fetch()).await
    }

    async fn leased_fetch(&self) -> Result<FetchOutcome, SyncError> {
        let (lease_outcome, guard) = self.lease.acquire_scoped(self.stale_threshold).await?;
        let Some(guard) = guard else {
            tracing::info!("Another instance is syncing, skipping this cycle");
            return Ok(FetchOutcome::skipped_due_to_lease());
        };

        let result = self.fetch_under_lease().await;
        guard.release().await;

        let mut outcome = result?;
        outcome.reclaimed_lease = lease_outcome == LeaseOutcome::ReclaimedAndAcquired;
        Ok(outcome)
    }

    async fn fetch_under_lease(&self) -> Result<FetchOutcome, SyncError> {
        let last_version = self.last_version();
        let fetch = self.feed.fetch_if_changed(last_version.as_deref()).await?;

        let items = match fetch.document {
            Some(document) if fetch.changed => {
                let total = document.items.len();
                let unseen = self.ledger.filter_unseen(document.items);
                tracing::info!("{} of {} items are new", unseen.len(), total);
                unseen
            }
            _ => Vec::new(),
        };

        if let Some(version) = &fetch.new_version
            && last_version.as_deref() != Some(version.as_str())
        {
            self.remember_version(version);
        }

        Ok(FetchOutcome {
            items,
            changed: fetch.changed,
            version: fetch.new_version,
            ..FetchOutcome::default()
        })
    }

    fn remember_version(&self, version: &str) {
        *self
            .last_version
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(version.to_string());

        if let Err(e) = self.persistence.save_token(LAST_VERSION_KEY, version) {
            tracing::warn!("Feed version {} kept in memory only: {:#}", version, e);
        }
    }

    /// Performs the action for `item` and records it as handled on success.
    ///
    /// The item is never recorded when the action fails, is refused, or is short-circuited.
    pub async fn act(&self, item: &CandidateItem) -> ActionOutcome {
        if self.ledger.contains(&item.id) {
            tracing::debug!("Item {} already handled, not acting again", item.id);
            return ActionOutcome::Failed(FailureReason::AlreadyProcessed);
        }

        match self
            .posting_breaker
            .call(|| self.executor.perform(item))
            .await
        {
            Ok(report) if report.success => {
                if let Err(e) = self.ledger.mark_seen(&item.id) {
                    tracing::warn!("Item {} handled but not durably recorded: {}", item.id, e);
                }
                tracing::info!("Completed item {}", item.id);
                ActionOutcome::Completed
            }
            Ok(report) => ActionOutcome::Failed(FailureReason::Rejected(report.message)),
            Err(SyncError::CircuitOpen { retry_after, .. }) => {
                ActionOutcome::Failed(FailureReason::CircuitOpen { retry_after })
            }
            Err(e) => {
                tracing::warn!("Action for item {} failed: {}", item.id, e);
                ActionOutcome::Failed(FailureReason::Remote(e.to_string()))
            }
        }
    }
}

/// Clears the re-entrance flag on every exit path.
struct CycleFlag<'a>(&'a AtomicBool);

impl Drop for CycleFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
