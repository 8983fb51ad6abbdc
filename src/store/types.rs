use crate::error::SyncError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata resolved without downloading an object's body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Opaque version token (an ETag or generation). Changes whenever the content changes.
    pub version: String,
    /// Timestamp (ms) when this version of the object was written.
    pub created_at: u64,
    /// Store generation, when the backend exposes one. Used for conditional deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

/// Access to the shared bucket.
///
/// Every method may fail with `SyncError::RemoteUnavailable`. Absent objects are `Ok(None)`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Cheap metadata-only probe.
    async fn stat_metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, SyncError>;

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError>;

    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<(), SyncError>;

    /// Deleting an absent object is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), SyncError>;

    /// Writes `bytes` only if no object exists at `key`. Returns `false` if one already did.
    ///
    /// The default is a plain probe-then-put and is NOT atomic. Adapters backed by a store
    /// with conditional writes override it.
    async fn create_if_absent(&self, key: &str, bytes: Vec<u8>) -> Result<bool, SyncError> {
        if self.stat_metadata(key).await?.is_some() {
            return Ok(false);
        }
        self.put_object(key, bytes).await?;
        Ok(true)
    }

    /// Deletes the object at `key` only if it is still the version described by `expected`.
    /// Returns `false` when it has since been replaced or removed.
    ///
    /// Like `create_if_absent`, the default is a probe-then-delete and is NOT atomic.
    async fn delete_if_unchanged(
        &self,
        key: &str,
        expected: &ObjectMetadata,
    ) -> Result<bool, SyncError> {
        match self.stat_metadata(key).await? {
            Some(current) if current.version == expected.version => {
                self.delete_object(key).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
