//! In-memory object store.
//!
//! Mirrors the semantics the coordination layer relies on from a real bucket: every write
//! produces a new version and a new creation time. Counts calls per operation so tests can
//! assert which paths were taken, and can be switched into an "unavailable" mode.

use super::types::{ObjectMetadata, ObjectStore};
use crate::clock::{Clock, system_clock};
use crate::error::SyncError;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    generation: u64,
    created_at: u64,
}

impl StoredObject {
    fn metadata(&self) -> ObjectMetadata {
        ObjectMetadata {
            version: format!("g{}", self.generation),
            created_at: self.created_at,
            generation: Some(self.generation.to_string()),
        }
    }
}

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub stat: AtomicUsize,
    pub get: AtomicUsize,
    pub put: AtomicUsize,
    pub delete: AtomicUsize,
}

pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
    next_generation: AtomicU64,
    clock: Clock,
    unavailable: AtomicBool,
    calls: CallCounts,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            objects: DashMap::new(),
            next_generation: AtomicU64::new(1),
            clock,
            unavailable: AtomicBool::new(false),
            calls: CallCounts::default(),
        }
    }

    /// While set, every operation fails with `RemoteUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn stat_calls(&self) -> usize {
        self.calls.stat.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.calls.get.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.calls.put.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), SyncError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn new_object(&self, bytes: Vec<u8>) -> StoredObject {
        StoredObject {
            bytes,
            generation: self.next_generation.fetch_add(1, Ordering::SeqCst),
            created_at: (self.clock)(),
        }
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn stat_metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, SyncError> {
        self.calls.stat.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.objects.get(key).map(|object| object.metadata()))
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.objects.get(key).map(|object| object.bytes.clone()))
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<(), SyncError> {
        self.calls.put.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let object = self.new_object(bytes);
        self.objects.insert(key.to_string(), object);
        tracing::trace!("memory store: put {}", key);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), SyncError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.objects.remove(key);
        Ok(())
    }

    async fn create_if_absent(&self, key: &str, bytes: Vec<u8>) -> Result<bool, SyncError> {
        self.calls.put.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        match self.objects.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(self.new_object(bytes));
                Ok(true)
            }
        }
    }

    async fn delete_if_unchanged(
        &self,
        key: &str,
        expected: &ObjectMetadata,
    ) -> Result<bool, SyncError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let removed = self
            .objects
            .remove_if(key, |_, object| object.metadata().version == expected.version);
        Ok(removed.is_some())
    }
}
