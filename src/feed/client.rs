//! Conditional fetch of the shared document.
//!
//! The version token is resolved with a metadata-only probe first. The body is downloaded only
//! when that token differs from the one the caller last saw, so a quiet feed costs one cheap
//! request per cycle.

use super::types::{ChangeFeedDocument, FeedFetch};
use crate::error::SyncError;
use crate::store::ObjectStore;

use std::sync::Arc;

pub struct ChangeFeedClient {
    store: Arc<dyn ObjectStore>,
    document_key: String,
}

impl ChangeFeedClient {
    pub fn new(store: Arc<dyn ObjectStore>, document_key: &str) -> Self {
        Self {
            store,
            document_key: document_key.to_string(),
        }
    }

    pub fn document_key(&self) -> &str {
        &self.document_key
    }

    /// Fetches the document if its version differs from `last_version`.
    ///
    /// # Returns
    /// * `changed = false, new_version = None` when the document does not exist yet.
    /// * `changed = false, new_version = Some(v)` when `v == last_version` (no body download).
    /// * `changed = true` with the decoded document otherwise.
    ///
    /// Store failures are returned as errors and must never be read as "unchanged".
    pub async fn fetch_if_changed(
        &self,
        last_version: Option<&str>,
    ) -> Result<FeedFetch, SyncError> {
        let Some(metadata) = self.store.stat_metadata(&self.document_key).await? else {
            tracing::debug!("Feed document {} not found", self.document_key);
            return Ok(FeedFetch::absent());
        };

        if last_version == Some(metadata.version.as_str()) {
            tracing::debug!("Feed version {} unchanged, skipping download", metadata.version);
            return Ok(FeedFetch::unchanged(metadata.version));
        }

        // Deleted between the probe and the download: same as never existing
        let Some(bytes) = self.store.get_object(&self.document_key).await? else {
            tracing::debug!("Feed document {} vanished before download", self.document_key);
            return Ok(FeedFetch::absent());
        };

        let mut document: ChangeFeedDocument = serde_json::from_slice(&bytes)?;
        document.version = Some(metadata.version.clone());

        tracing::info!(
            "Fetched feed version {} with {} items",
            metadata.version,
            document.items.len()
        );

        Ok(FeedFetch::changed(document, metadata.version))
    }
}
