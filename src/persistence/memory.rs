use super::LocalPersistence;

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Volatile persistence with switchable write failures.
#[derive(Default)]
pub struct MemoryPersistence {
    sets: DashMap<String, HashSet<String>>,
    tokens: DashMap<String, String>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every save fails.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn stored_set(&self, key: &str) -> HashSet<String> {
        self.sets
            .get(key)
            .map(|set| set.value().clone())
            .unwrap_or_default()
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("simulated write failure"));
        }
        Ok(())
    }
}

impl LocalPersistence for MemoryPersistence {
    fn load_string_set(&self, key: &str) -> anyhow::Result<HashSet<String>> {
        Ok(self.stored_set(key))
    }

    fn save_string_set(&self, key: &str, values: &HashSet<String>) -> anyhow::Result<()> {
        self.check_writable()?;
        self.sets.insert(key.to_string(), values.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load_token(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.tokens.get(key).map(|token| token.value().clone()))
    }

    fn save_token(&self, key: &str, token: &str) -> anyhow::Result<()> {
        self.check_writable()?;
        self.tokens.insert(key.to_string(), token.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
