//! Google Cloud Storage adapter.
//!
//! Speaks the GCS JSON API directly:
//! - metadata probe: `GET /storage/v1/b/{bucket}/o/{name}?alt=json`
//! - body download: `GET /storage/v1/b/{bucket}/o/{name}?alt=media`
//! - upload: `POST /upload/storage/v1/b/{bucket}/o?uploadType=media&name={name}`
//! - conditional create: the same upload with `ifGenerationMatch=0` (412 when the object exists)
//! - delete: `DELETE /storage/v1/b/{bucket}/o/{name}`
//! - conditional delete: the same delete with `ifGenerationMatch={generation}`
//!
//! Requests are never retried here. A failed call is reported as `RemoteUnavailable` and it is
//! up to the caller's circuit breaker to decide what happens next.

use super::types::{ObjectMetadata, ObjectStore};
use crate::error::SyncError;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

/// Subset of the GCS object resource we care about.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    etag: Option<String>,
    generation: Option<String>,
    time_created: Option<String>,
}

pub struct HttpObjectStore {
    base_url: Url,
    bucket: String,
    access_token: Option<String>,
    request_timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(
        base_url: &str,
        bucket: &str,
        access_token: Option<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow::anyhow!("Store base url cannot be a base: {}", base_url));
        }

        Ok(Self {
            base_url,
            bucket: bucket.to_string(),
            access_token,
            request_timeout,
            http_client: reqwest::Client::new(),
        })
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::RemoteUnavailable("invalid store base url".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn object_url(&self, key: &str) -> Result<Url, SyncError> {
        self.url_with_segments(&["storage", "v1", "b", &self.bucket, "o", key])
    }

    fn upload_url(&self) -> Result<Url, SyncError> {
        self.url_with_segments(&["upload", "storage", "v1", "b", &self.bucket, "o"])
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.timeout(self.request_timeout);
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        only_if_absent: bool,
    ) -> Result<reqwest::Response, SyncError> {
        let mut query = vec![("uploadType", "media"), ("name", key)];
        if only_if_absent {
            query.push(("ifGenerationMatch", "0"));
        }

        let request = self
            .http_client
            .post(self.upload_url()?)
            .query(&query)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(bytes);

        Ok(self.authorize(request).send().await?)
    }
}

fn unavailable(operation: &str, key: &str, status: StatusCode) -> SyncError {
    SyncError::RemoteUnavailable(format!("{} {} failed: {}", operation, key, status))
}

fn parse_created_at(time_created: Option<&str>) -> u64 {
    match time_created.map(chrono::DateTime::parse_from_rfc3339) {
        Some(Ok(parsed)) => parsed.timestamp_millis().max(0) as u64,
        Some(Err(e)) => {
            tracing::debug!("Unparseable timeCreated, treating object as ancient: {}", e);
            0
        }
        None => 0,
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn stat_metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, SyncError> {
        let request = self
            .http_client
            .get(self.object_url(key)?)
            .query(&[("alt", "json")]);
        let response = self.authorize(request).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(unavailable("stat", key, response.status()));
        }

        let body = response.bytes().await?;
        let resource: ObjectResource = serde_json::from_slice(&body)?;

        let version = resource
            .etag
            .or_else(|| resource.generation.clone())
            .ok_or_else(|| SyncError::RemoteUnavailable(format!("no version token for {}", key)))?;

        Ok(Some(ObjectMetadata {
            version,
            created_at: parse_created_at(resource.time_created.as_deref()),
            generation: resource.generation,
        }))
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError> {
        let request = self
            .http_client
            .get(self.object_url(key)?)
            .query(&[("alt", "media")]);
        let response = self.authorize(request).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(unavailable("download", key, response.status()));
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<(), SyncError> {
        let response = self.upload(key, bytes, false).await?;
        if !response.status().is_success() {
            return Err(unavailable("upload", key, response.status()));
        }
        tracing::debug!("Uploaded {} to bucket {}", key, self.bucket);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), SyncError> {
        let request = self.http_client.delete(self.object_url(key)?);
        let response = self.authorize(request).send().await?;

        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        Err(unavailable("delete", key, response.status()))
    }

    async fn delete_if_unchanged(
        &self,
        key: &str,
        expected: &ObjectMetadata,
    ) -> Result<bool, SyncError> {
        let Some(generation) = expected.generation.as_deref() else {
            return Err(SyncError::RemoteUnavailable(format!(
                "no generation known for {}, refusing unconditional delete",
                key
            )));
        };

        let request = self
            .http_client
            .delete(self.object_url(key)?)
            .query(&[("ifGenerationMatch", generation)]);
        let response = self.authorize(request).send().await?;

        match response.status() {
            StatusCode::PRECONDITION_FAILED | StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(unavailable("conditional delete", key, status)),
        }
    }

    async fn create_if_absent(&self, key: &str, bytes: Vec<u8>) -> Result<bool, SyncError> {
        let response = self.upload(key, bytes, true).await?;
        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(unavailable("conditional upload", key, response.status()));
        }
        Ok(true)
    }
}
