//! Local Persistence Module
//!
//! Durable, instance-private state: the idempotency ledger's id set and the last observed
//! document version token. Nothing stored here is ever shared between client instances.
//!
//! All operations are synchronous and durable on return.

pub mod file;
pub mod memory;

pub use file::FilePersistence;
pub use memory::MemoryPersistence;

use std::collections::HashSet;

/// Key under which the idempotency ledger stores processed ids.
pub const PROCESSED_IDS_KEY: &str = "processed_ids";
/// Key under which the last observed document version is stored.
pub const LAST_VERSION_KEY: &str = "last_version";

pub trait LocalPersistence: Send + Sync {
    /// Returns an empty set when nothing was stored yet.
    fn load_string_set(&self, key: &str) -> anyhow::Result<HashSet<String>>;

    fn save_string_set(&self, key: &str, values: &HashSet<String>) -> anyhow::Result<()>;

    fn load_token(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn save_token(&self, key: &str, token: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests;
