//! Three-state circuit breaker.
//!
//! ## States
//! - **Closed**: calls pass. Each failure bumps the count; reaching the threshold opens the
//!   breaker. Any success resets the count.
//! - **Open**: calls are rejected with `CircuitOpen` without being invoked until the reset
//!   timeout has elapsed. The next call after that becomes the half-open trial.
//! - **HalfOpen**: exactly one trial is in flight. Success closes the breaker, failure reopens
//!   it with a fresh deadline. Calls arriving while the trial runs are rejected.
//!
//! Every call is bounded by the configured timeout and an elapsed timeout is a failure.
//! Deadlines use `tokio::time::Instant` so paused-time tests can drive them.

use super::types::{BreakerSettings, BreakerSnapshot, BreakerState};
use crate::clock::now_ms;
use crate::error::SyncError;

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    next_attempt_at: Option<Instant>,
    last_failure_at: Option<u64>,
    trial_in_flight: bool,
}

impl BreakerInner {
    fn closed() -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            next_attempt_at: None,
            last_failure_at: None,
            trial_in_flight: false,
        }
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.next_attempt_at
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: &str, settings: BreakerSettings) -> Self {
        Self {
            name: name.to_string(),
            settings,
            inner: Mutex::new(BreakerInner::closed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_error(&self, retry_after: Duration) -> SyncError {
        SyncError::CircuitOpen {
            breaker: self.name.clone(),
            retry_after,
        }
    }

    /// Runs `f` under the breaker.
    ///
    /// # Returns
    /// * `Err(CircuitOpen)` without calling `f` while the breaker is open or a trial is running.
    /// * `Err(Timeout)` if `f` does not finish within the configured timeout.
    /// * Whatever `f` returned otherwise.
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let is_trial = self.admit()?;
        let mut trial = TrialSlot {
            breaker: self,
            armed: is_trial,
        };

        let started = Instant::now();
        let result = match tokio::time::timeout(self.settings.timeout, f()).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                breaker: self.name.clone(),
                after: self.settings.timeout,
            }),
        };
        trial.armed = false;

        match &result {
            Ok(_) => self.on_success(started.elapsed()),
            Err(e) => self.on_failure(e, started.elapsed()),
        }
        result
    }

    /// Fails fast with `CircuitOpen` if a call made now would be rejected. Does not change state.
    pub fn ensure_available(&self) -> Result<(), SyncError> {
        let inner = self.lock();
        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let remaining = inner.remaining(Instant::now());
                if remaining.is_zero() {
                    Ok(())
                } else {
                    Err(self.open_error(remaining))
                }
            }
            BreakerState::HalfOpen if inner.trial_in_flight => Err(self.open_error(Duration::ZERO)),
            BreakerState::HalfOpen => Ok(()),
        }
    }

    /// Returns true when the caller is the half-open trial.
    fn admit(&self) -> Result<bool, SyncError> {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => Ok(false),
            BreakerState::Open => {
                let remaining = inner.remaining(Instant::now());
                if !remaining.is_zero() {
                    tracing::debug!(
                        "Breaker {} open, rejecting call ({}s left)",
                        self.name,
                        remaining.as_secs()
                    );
                    return Err(self.open_error(remaining));
                }
                inner.state = BreakerState::HalfOpen;
                inner.trial_in_flight = true;
                tracing::info!("Breaker {} half-open, admitting trial call", self.name);
                Ok(true)
            }
            BreakerState::HalfOpen => {
                if inner.trial_in_flight {
                    return Err(self.open_error(Duration::ZERO));
                }
                inner.trial_in_flight = true;
                Ok(true)
            }
        }
    }

    fn on_success(&self, elapsed: Duration) {
        let mut inner = self.lock();
        inner.failure_count = 0;
        inner.trial_in_flight = false;
        if inner.state != BreakerState::Closed {
            inner.state = BreakerState::Closed;
            inner.next_attempt_at = None;
            tracing::info!(
                "Breaker {} closed (success after {}ms)",
                self.name,
                elapsed.as_millis()
            );
        }
    }

    fn on_failure(&self, error: &SyncError, elapsed: Duration) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure_at = Some(now_ms());
        inner.trial_in_flight = false;

        tracing::warn!(
            "Breaker {} failure {}/{}: {} ({}ms)",
            self.name,
            inner.failure_count,
            self.settings.threshold,
            error,
            elapsed.as_millis()
        );

        let trial_failed = inner.state == BreakerState::HalfOpen;
        if trial_failed || inner.failure_count >= self.settings.threshold {
            inner.state = BreakerState::Open;
            inner.next_attempt_at = Some(Instant::now() + self.settings.reset_timeout);
            tracing::warn!(
                "Breaker {} opened, next attempt in {}s",
                self.name,
                self.settings.reset_timeout.as_secs()
            );
        }
    }

    /// Forces the breaker closed with a zero failure count.
    pub fn reset(&self) {
        *self.lock() = BreakerInner::closed();
        tracing::info!("Breaker {} manually reset", self.name);
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let retry_after_ms = match inner.state {
            BreakerState::Open => Some(inner.remaining(Instant::now()).as_millis() as u64),
            _ => None,
        };
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            threshold: self.settings.threshold,
            retry_after_ms,
            last_failure_at: inner.last_failure_at,
        }
    }
}

/// Runs `f` through `breaker` when one is attached, directly otherwise.
pub async fn call_with<F, Fut, T>(breaker: Option<&CircuitBreaker>, f: F) -> Result<T, SyncError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    match breaker {
        Some(breaker) => breaker.call(f).await,
        None => f().await,
    }
}

/// Frees the half-open trial slot if the trial future is dropped before it resolves.
struct TrialSlot<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for TrialSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.lock().trial_in_flight = false;
        }
    }
}
