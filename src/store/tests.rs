//! Store Module Tests
//!
//! ## Test Scopes
//! - **MemoryObjectStore**: Versioning, conditional create and delete, failure injection and
//!   call counting.
//! - **HttpObjectStore**: Request shapes against a local mock of the GCS JSON API.

#[cfg(test)]
mod tests {
    use crate::clock::ManualClock;
    use crate::error::SyncError;
    use crate::store::http::HttpObjectStore;
    use crate::store::memory::MemoryObjectStore;
    use crate::store::types::ObjectStore;

    use axum::body::Bytes;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use dashmap::DashMap;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    // ============================================================
    // MEMORY STORE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_memory_store_absent_object_is_none() {
        let store = MemoryObjectStore::new();

        assert!(store.stat_metadata("replies.json").await.unwrap().is_none());
        assert!(store.get_object("replies.json").await.unwrap().is_none());
        // Deleting something that is not there is fine
        assert!(store.delete_object("replies.json").await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_store_every_write_gets_a_new_version() {
        let clock = ManualClock::new(1_000);
        let store = MemoryObjectStore::with_clock(clock.as_clock());

        store.put_object("doc", b"one".to_vec()).await.unwrap();
        let first = store.stat_metadata("doc").await.unwrap().unwrap();

        clock.advance(500);
        store.put_object("doc", b"two".to_vec()).await.unwrap();
        let second = store.stat_metadata("doc").await.unwrap().unwrap();

        assert_ne!(first.version, second.version);
        assert_eq!(first.created_at, 1_000);
        assert_eq!(second.created_at, 1_500);
        assert_eq!(store.get_object("doc").await.unwrap().unwrap(), b"two".to_vec());
    }

    #[tokio::test]
    async fn test_memory_store_create_if_absent_is_exclusive() {
        let store = MemoryObjectStore::new();

        let first = store.create_if_absent("lock", b"a".to_vec()).await.unwrap();
        let second = store.create_if_absent("lock", b"b".to_vec()).await.unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(store.get_object("lock").await.unwrap().unwrap(), b"a".to_vec());
    }

    #[tokio::test]
    async fn test_memory_store_delete_if_unchanged_checks_version() {
        let store = MemoryObjectStore::new();
        store.put_object("lock", b"old".to_vec()).await.unwrap();
        let observed = store.stat_metadata("lock").await.unwrap().unwrap();

        // Replaced after we looked at it
        store.put_object("lock", b"new".to_vec()).await.unwrap();
        assert!(!store.delete_if_unchanged("lock", &observed).await.unwrap());
        assert!(store.contains("lock"));

        let current = store.stat_metadata("lock").await.unwrap().unwrap();
        assert!(store.delete_if_unchanged("lock", &current).await.unwrap());
        assert!(!store.contains("lock"));

        // Gone entirely
        assert!(!store.delete_if_unchanged("lock", &current).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_unavailable_fails_every_call() {
        let store = MemoryObjectStore::new();
        store.set_unavailable(true);

        let stat = store.stat_metadata("doc").await;
        let put = store.put_object("doc", vec![]).await;

        assert!(matches!(stat, Err(SyncError::RemoteUnavailable(_))));
        assert!(matches!(put, Err(SyncError::RemoteUnavailable(_))));

        store.set_unavailable(false);
        assert!(store.stat_metadata("doc").await.is_ok());
        assert_eq!(store.stat_calls(), 2);
        assert_eq!(store.put_calls(), 1);
    }

    // ============================================================
    // HTTP STORE TESTS (local GCS mock)
    // ============================================================

    type Bucket = Arc<DashMap<String, (Vec<u8>, u64)>>;

    async fn handle_object_get(
        State(bucket): State<Bucket>,
        Path((_bucket, name)): Path<(String, String)>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let Some(entry) = bucket.get(&name) else {
            return StatusCode::NOT_FOUND.into_response();
        };
        let (bytes, generation) = entry.value().clone();

        match params.get("alt").map(String::as_str) {
            Some("media") => (StatusCode::OK, bytes).into_response(),
            _ => Json(serde_json::json!({
                "name": name,
                "etag": format!("etag-{}", generation),
                "generation": generation.to_string(),
                "timeCreated": "2024-01-01T00:00:00.000Z",
            }))
            .into_response(),
        }
    }

    async fn handle_object_delete(
        State(bucket): State<Bucket>,
        Path((_bucket, name)): Path<(String, String)>,
        Query(params): Query<HashMap<String, String>>,
    ) -> StatusCode {
        let Some(current) = bucket.get(&name).map(|entry| entry.value().1) else {
            return StatusCode::NOT_FOUND;
        };
        if let Some(expected) = params.get("ifGenerationMatch")
            && expected != &current.to_string()
        {
            return StatusCode::PRECONDITION_FAILED;
        }
        bucket.remove(&name);
        StatusCode::NO_CONTENT
    }

    async fn handle_upload(
        State(bucket): State<Bucket>,
        Query(params): Query<HashMap<String, String>>,
        body: Bytes,
    ) -> StatusCode {
        let Some(name) = params.get("name") else {
            return StatusCode::BAD_REQUEST;
        };
        if params.get("ifGenerationMatch").map(String::as_str) == Some("0")
            && bucket.contains_key(name)
        {
            return StatusCode::PRECONDITION_FAILED;
        }
        let generation = bucket.get(name).map(|entry| entry.value().1 + 1).unwrap_or(1);
        bucket.insert(name.clone(), (body.to_vec(), generation));
        StatusCode::OK
    }

    async fn spawn_mock_gcs() -> (String, Bucket) {
        let bucket: Bucket = Arc::new(DashMap::new());
        let app = Router::new()
            .route(
                "/storage/v1/b/:bucket/o/:name",
                get(handle_object_get).delete(handle_object_delete),
            )
            .route("/upload/storage/v1/b/:bucket/o", post(handle_upload))
            .with_state(bucket.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), bucket)
    }

    #[tokio::test]
    async fn test_http_store_round_trip_against_mock() {
        let (base_url, _bucket) = spawn_mock_gcs().await;
        let store =
            HttpObjectStore::new(&base_url, "feeds", None, Duration::from_secs(5)).unwrap();

        // ACT: absent object
        assert!(store.stat_metadata("replies.json").await.unwrap().is_none());

        // ACT: upload then probe
        store
            .put_object("replies.json", br#"{"items":[]}"#.to_vec())
            .await
            .unwrap();
        let metadata = store.stat_metadata("replies.json").await.unwrap().unwrap();
        let body = store.get_object("replies.json").await.unwrap().unwrap();

        // ASSERT
        assert_eq!(metadata.version, "etag-1");
        assert_eq!(metadata.created_at, 1_704_067_200_000);
        assert_eq!(body, br#"{"items":[]}"#.to_vec());

        store.delete_object("replies.json").await.unwrap();
        assert!(store.stat_metadata("replies.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_http_store_conditional_create_maps_precondition_failed() {
        let (base_url, _bucket) = spawn_mock_gcs().await;
        let store =
            HttpObjectStore::new(&base_url, "feeds", None, Duration::from_secs(5)).unwrap();

        let first = store.create_if_absent("processing.lock", b"{}".to_vec()).await.unwrap();
        let second = store.create_if_absent("processing.lock", b"{}".to_vec()).await.unwrap();

        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn test_http_store_conditional_delete_uses_generation() {
        let (base_url, _bucket) = spawn_mock_gcs().await;
        let store =
            HttpObjectStore::new(&base_url, "feeds", None, Duration::from_secs(5)).unwrap();
        store.put_object("processing.lock", b"{}".to_vec()).await.unwrap();
        let stale = store.stat_metadata("processing.lock").await.unwrap().unwrap();
        assert_eq!(stale.generation.as_deref(), Some("1"));

        // ACT: replaced by another writer, so the stale generation no longer matches
        store.put_object("processing.lock", b"{}".to_vec()).await.unwrap();
        let refused = store.delete_if_unchanged("processing.lock", &stale).await.unwrap();
        let fresh = store.stat_metadata("processing.lock").await.unwrap().unwrap();
        let deleted = store.delete_if_unchanged("processing.lock", &fresh).await.unwrap();

        // ASSERT
        assert!(!refused);
        assert!(deleted);
        assert!(store.stat_metadata("processing.lock").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_http_store_unreachable_is_remote_unavailable() {
        // Nothing listens on port 9 (discard) in the test environment
        let store = HttpObjectStore::new(
            "http://127.0.0.1:9",
            "feeds",
            None,
            Duration::from_millis(500),
        )
        .unwrap();

        let result = store.stat_metadata("replies.json").await;

        assert!(matches!(result, Err(SyncError::RemoteUnavailable(_))));
    }
}
