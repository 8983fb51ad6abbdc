//! Local idempotency ledger.
//!
//! Holds the ids this instance has already acted upon. Loaded once at startup, written back in
//! full after every mutation. The set only grows.
//!
//! The write happens under the same lock as the insert, so snapshots reach disk in the order
//! they were taken and a slow writer can never overwrite a newer set with an older one.

use crate::error::SyncError;
use crate::feed::CandidateItem;
use crate::persistence::{LocalPersistence, PROCESSED_IDS_KEY};

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

struct LedgerState {
    seen: HashSet<String>,
    /// Set when the last write failed and the in-memory set is ahead of disk.
    dirty: bool,
}

pub struct IdempotencyLedger {
    state: Mutex<LedgerState>,
    persistence: Arc<dyn LocalPersistence>,
    key: String,
}

impl IdempotencyLedger {
    /// Loads the persisted set. A failed load degrades to an empty in-memory ledger.
    pub fn load(persistence: Arc<dyn LocalPersistence>) -> Self {
        Self::load_with_key(persistence, PROCESSED_IDS_KEY)
    }

    pub fn load_with_key(persistence: Arc<dyn LocalPersistence>, key: &str) -> Self {
        let seen = match persistence.load_string_set(key) {
            Ok(seen) => {
                tracing::info!("Loaded {} processed ids", seen.len());
                seen
            }
            Err(e) => {
                tracing::warn!("Failed to load processed ids, starting empty: {:#}", e);
                HashSet::new()
            }
        };

        Self {
            state: Mutex::new(LedgerState { seen, dirty: false }),
            persistence,
            key: key.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drops items that were already acted upon, preserving input order.
    pub fn filter_unseen(&self, items: impl IntoIterator<Item = CandidateItem>) -> Vec<CandidateItem> {
        let state = self.lock();
        items
            .into_iter()
            .filter(|item| !state.seen.contains(&item.id))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records `id` and persists the full set before returning.
    ///
    /// # Returns
    /// * `Ok(true)` when the id was new and is now durable.
    /// * `Ok(false)` when the id was already present (nothing is written).
    /// * `Err(PersistenceFailure)` when the write failed. The id is still recorded in memory.
    pub fn mark_seen(&self, id: &str) -> Result<bool, SyncError> {
        let mut state = self.lock();
        if !state.seen.insert(id.to_string()) {
            return Ok(false);
        }
        self.persist(&mut state)?;
        Ok(true)
    }

    /// Retries a write that previously failed. A no-op when disk is up to date.
    pub fn flush(&self) -> Result<(), SyncError> {
        let mut state = self.lock();
        if !state.dirty {
            return Ok(());
        }
        self.persist(&mut state)
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    fn persist(&self, state: &mut LedgerState) -> Result<(), SyncError> {
        match self.persistence.save_string_set(&self.key, &state.seen) {
            Ok(()) => {
                state.dirty = false;
                Ok(())
            }
            Err(e) => {
                state.dirty = true;
                tracing::warn!("Processed ids kept in memory only: {:#}", e);
                Err(SyncError::PersistenceFailure(format!("{:#}", e)))
            }
        }
    }
}
