//! Breaker Registry
//!
//! Owns one breaker per dependency class. Built once at startup and injected wherever remote
//! calls are made, so every caller of a given dependency shares the same failure count.

use super::circuit::CircuitBreaker;
use super::types::{BreakerSettings, BreakerSnapshot, DependencyClass};

use dashmap::DashMap;
use std::sync::Arc;

pub struct BreakerRegistry {
    breakers: DashMap<DependencyClass, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Creates a registry with every dependency class at its default settings.
    pub fn with_defaults() -> Arc<Self> {
        Self::with_settings(
            DependencyClass::ALL
                .iter()
                .map(|class| (*class, class.default_settings())),
        )
    }

    pub fn with_settings(
        settings: impl IntoIterator<Item = (DependencyClass, BreakerSettings)>,
    ) -> Arc<Self> {
        let registry = Self {
            breakers: DashMap::new(),
        };
        for (class, settings) in settings {
            registry.register(class, settings);
        }
        Arc::new(registry)
    }

    /// Installs a fresh breaker for `class`, replacing any existing one.
    pub fn register(&self, class: DependencyClass, settings: BreakerSettings) {
        self.breakers
            .insert(class, Arc::new(CircuitBreaker::new(class.name(), settings)));
        tracing::debug!(
            "Registered breaker {} (threshold {}, timeout {}s, reset {}s)",
            class,
            settings.threshold,
            settings.timeout.as_secs(),
            settings.reset_timeout.as_secs()
        );
    }

    /// Returns the breaker for `class`, creating it with default settings on first use.
    pub fn get(&self, class: DependencyClass) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(class)
            .or_insert_with(|| Arc::new(CircuitBreaker::new(class.name(), class.default_settings())))
            .clone()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        let class = DependencyClass::parse(name)?;
        self.breakers.get(&class).map(|entry| entry.value().clone())
    }

    /// Resets the named breaker. Returns false if no such breaker exists.
    pub fn reset_by_name(&self, name: &str) -> bool {
        match self.get_by_name(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }

    /// Snapshots of all breakers, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<BreakerSnapshot> = self
            .breakers
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
