//! Circuit Breaker Module
//!
//! Wraps every call to an unreliable remote dependency. A struggling dependency gets a rest
//! instead of a stream of retries, and callers get a fast `CircuitOpen` they can surface.
//!
//! ## Submodules
//! - **`types`**: States, settings, dependency classes and status snapshots.
//! - **`circuit`**: The `CircuitBreaker` state machine.
//! - **`registry`**: `BreakerRegistry`, one breaker per dependency class.

pub mod circuit;
pub mod registry;
pub mod types;

pub use circuit::{CircuitBreaker, call_with};
pub use registry::BreakerRegistry;
pub use types::{BreakerSettings, BreakerSnapshot, BreakerState, DependencyClass};
