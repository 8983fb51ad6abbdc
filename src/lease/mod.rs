//! Lease Coordination Module
//!
//! Serializes sync cycles across client instances with an advisory lease object stored next to
//! the document it protects. The lease is not a hard lock: it expires after a fixed staleness
//! threshold so a crashed or partitioned holder cannot block the fleet forever.

pub mod coordinator;
pub mod types;

pub use coordinator::{LeaseCoordinator, LeaseGuard, is_stale};
pub use types::{InstanceId, LeaseOutcome, LeaseRecord};

use std::time::Duration;

/// Age after which a lease is presumed abandoned.
pub const STALE_LEASE_THRESHOLD: Duration = Duration::from_secs(5 * 60);
