//! Feed Module Tests
//!
//! ## Test Scopes
//! - **ChangeFeedClient**: Metadata-first fetch, the "unchanged" short-circuit, absent documents.
//! - **Data Types**: Document decoding (including the producer's legacy field names) and stats.
//! - **TopicsClient**: Default fallback, upload, and the storage breaker around both.

#[cfg(test)]
mod tests {
    use crate::breaker::{BreakerSettings, BreakerState, CircuitBreaker};
    use crate::error::SyncError;
    use crate::feed::topics::{TopicsClient, default_topics};
    use crate::feed::types::{CandidateItem, ChangeFeedDocument, ItemStats};
    use crate::feed::ChangeFeedClient;
    use crate::store::memory::MemoryObjectStore;
    use crate::store::ObjectStore;
    use std::sync::Arc;
    use std::time::Duration;

    const DOC_KEY: &str = "replies.json";

    fn three_item_document() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "items": [
                {"id": "item-1", "reply": "first", "score": 80},
                {"id": "item-2", "reply": "second", "score": 60},
                {"id": "item-3", "score": 10}
            ],
            "producedAt": "2024-05-01T09:00:00Z"
        }))
        .unwrap()
    }

    // ============================================================
    // TEST 1: ChangeFeedClient
    // ============================================================

    #[tokio::test]
    async fn test_absent_document_is_not_an_error() {
        let store = Arc::new(MemoryObjectStore::new());
        let client = ChangeFeedClient::new(store.clone(), DOC_KEY);

        let fetch = client.fetch_if_changed(None).await.unwrap();

        assert!(!fetch.changed);
        assert!(fetch.document.is_none());
        assert!(fetch.new_version.is_none());
        assert_eq!(store.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_first_fetch_downloads_document() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object(DOC_KEY, three_item_document()).await.unwrap();
        let client = ChangeFeedClient::new(store.clone(), DOC_KEY);

        let fetch = client.fetch_if_changed(None).await.unwrap();

        assert!(fetch.changed);
        let document = fetch.document.unwrap();
        assert_eq!(document.items.len(), 3);
        assert_eq!(document.version, fetch.new_version);
        assert_eq!(document.produced_at.as_deref(), Some("2024-05-01T09:00:00Z"));
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_same_version_skips_body_download() {
        // ARRANGE
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object(DOC_KEY, three_item_document()).await.unwrap();
        let client = ChangeFeedClient::new(store.clone(), DOC_KEY);
        let version = store.stat_metadata(DOC_KEY).await.unwrap().unwrap().version;
        let gets_before = store.get_calls();

        // ACT: repeated polls with the observed version
        for _ in 0..5 {
            let fetch = client.fetch_if_changed(Some(&version)).await.unwrap();
            assert!(!fetch.changed);
            assert!(fetch.document.is_none());
            assert_eq!(fetch.new_version.as_deref(), Some(version.as_str()));
        }

        // ASSERT: never touched the body
        assert_eq!(store.get_calls(), gets_before);
    }

    #[tokio::test]
    async fn test_new_version_is_downloaded() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object(DOC_KEY, three_item_document()).await.unwrap();
        let client = ChangeFeedClient::new(store.clone(), DOC_KEY);
        let first = client.fetch_if_changed(None).await.unwrap();

        store
            .put_object(DOC_KEY, br#"{"items":[{"id":"item-9"}]}"#.to_vec())
            .await
            .unwrap();
        let second = client
            .fetch_if_changed(first.new_version.as_deref())
            .await
            .unwrap();

        assert!(second.changed);
        assert_ne!(second.new_version, first.new_version);
        assert_eq!(second.document.unwrap().items[0].id, "item-9");
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error_not_unchanged() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object(DOC_KEY, three_item_document()).await.unwrap();
        store.set_unavailable(true);
        let client = ChangeFeedClient::new(store, DOC_KEY);

        let result = client.fetch_if_changed(Some("g1")).await;

        assert!(matches!(result, Err(SyncError::RemoteUnavailable(_))));
    }

    #[tokio::test]
    async fn test_corrupt_document_is_decode_error() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object(DOC_KEY, b"{not json".to_vec()).await.unwrap();
        let client = ChangeFeedClient::new(store, DOC_KEY);

        let result = client.fetch_if_changed(None).await;

        assert!(matches!(result, Err(SyncError::Decode(_))));
    }

    // ============================================================
    // TEST 2: Data types
    // ============================================================

    #[test]
    fn test_document_accepts_producer_field_names() {
        let json = r#"{
            "replies": [{"id": "p1", "reply": "hi", "author": "Ada", "url": "https://x.test/1"}],
            "last_updated": "2024-05-01T09:00:00Z",
            "total_processed": 7
        }"#;

        let document: ChangeFeedDocument = serde_json::from_str(json).unwrap();

        assert_eq!(document.items.len(), 1);
        assert_eq!(document.items[0].url(), Some("https://x.test/1"));
        assert_eq!(document.items[0].payload["author"], "Ada");
        assert_eq!(document.produced_at.as_deref(), Some("2024-05-01T09:00:00Z"));
    }

    #[test]
    fn test_actionable_field_requires_non_blank_reply() {
        assert!(CandidateItem::new("a").with_reply("Great point").has_actionable_field());
        assert!(!CandidateItem::new("b").with_reply("   ").has_actionable_field());
        assert!(!CandidateItem::new("c").has_actionable_field());
    }

    #[test]
    fn test_item_stats() {
        let items = vec![
            CandidateItem::new("a")
                .with_reply("yes")
                .with_field("score", serde_json::json!(90)),
            CandidateItem::new("b").with_field("score", serde_json::json!(45)),
            CandidateItem::new("c").with_reply(""),
        ];

        let stats = ItemStats::from_items(&items);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.ready, 1);
        assert_eq!(stats.average_score, 45);
        assert_eq!(ItemStats::from_items(&[]), ItemStats::default());
    }

    // ============================================================
    // TEST 3: Topics
    // ============================================================

    #[tokio::test]
    async fn test_topics_default_when_missing_or_unreachable() {
        let store = Arc::new(MemoryObjectStore::new());
        let topics = TopicsClient::new(store.clone(), "topics.json");

        assert_eq!(topics.fetch_topics().await, default_topics());

        store.set_unavailable(true);
        assert_eq!(topics.fetch_topics().await, default_topics());
    }

    #[tokio::test]
    async fn test_topics_upload_then_fetch() {
        let store = Arc::new(MemoryObjectStore::new());
        let topics = TopicsClient::new(store.clone(), "topics.json");
        let chosen = vec!["Rust".to_string(), "Science".to_string()];

        topics.upload_topics(&chosen).await.unwrap();

        assert_eq!(topics.fetch_topics().await, chosen);
        let raw: serde_json::Value =
            serde_json::from_slice(&store.get_object("topics.json").await.unwrap().unwrap())
                .unwrap();
        assert!(raw["last_updated"].is_string());
    }

    #[tokio::test]
    async fn test_topics_calls_go_through_breaker() {
        // ARRANGE
        let store = Arc::new(MemoryObjectStore::new());
        let breaker = Arc::new(CircuitBreaker::new(
            "storage",
            BreakerSettings::new(2, Duration::from_secs(5), Duration::from_secs(300)),
        ));
        let topics = TopicsClient::new(store.clone(), "topics.json").with_breaker(breaker.clone());
        store.set_unavailable(true);

        // ACT: a failed read still falls back, but is counted
        assert_eq!(topics.fetch_topics().await, default_topics());
        let upload = topics.upload_topics(&["Rust".to_string()]).await;

        // ASSERT
        assert!(matches!(upload, Err(SyncError::RemoteUnavailable(_))));
        assert_eq!(breaker.state(), BreakerState::Open);

        // Open breaker: uploads are refused without reaching the store
        let puts = store.put_calls();
        let refused = topics.upload_topics(&["Rust".to_string()]).await;
        assert!(refused.unwrap_err().is_circuit_open());
        assert_eq!(store.put_calls(), puts);
    }
}
