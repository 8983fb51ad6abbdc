//! Candidate Sync Library
//!
//! Coordination and resilience layer for client instances (mobile app, desktop app,
//! background worker) that share one object-storage bucket as their system of record.
//! There is no coordination service: mutual exclusion, change detection and idempotency are
//! implemented directly against the bucket.
//!
//! ## Architecture Modules
//! - **`store`**: The `ObjectStore` seam plus in-memory and GCS adapters.
//! - **`feed`**: Conditional fetch of the shared document and the topics object.
//! - **`lease`**: Advisory lease with stale-lease reclamation.
//! - **`ledger`**: Instance-local record of items already acted upon.
//! - **`breaker`**: Per-dependency circuit breakers.
//! - **`action`**: The per-item side effect (`ActionExecutor`).
//! - **`sync`**: `SyncOrchestrator`, batching, the background worker and the control API.
//! - **`persistence`**: Durable instance-private state.
//! - **`config`**: Runtime configuration.

pub mod action;
pub mod breaker;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod lease;
pub mod ledger;
pub mod persistence;
pub mod store;
pub mod sync;

pub use error::SyncError;
