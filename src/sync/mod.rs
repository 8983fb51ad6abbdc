//! Sync Module
//!
//! The part client code talks to. Everything below it (lease, feed, ledger, breakers) is
//! wired together here.
//!
//! ## Submodules
//! - **`orchestrator`**: `SyncOrchestrator::fetch_new_items` and `act`.
//! - **`batch`**: Sequential, paced processing of a list of items.
//! - **`worker`**: The periodic background cycle.
//! - **`handlers`** / **`protocol`**: HTTP control surface.

pub mod batch;
pub mod handlers;
pub mod orchestrator;
pub mod protocol;
pub mod types;
pub mod worker;

pub use batch::BatchProcessor;
pub use orchestrator::SyncOrchestrator;
pub use types::{
    ActionOutcome, BatchError, BatchItemResult, BatchProgress, BatchReport, DelayPolicy,
    FailureReason, FetchOutcome,
};
pub use worker::{DEFAULT_POLL_INTERVAL, SyncWorker};
