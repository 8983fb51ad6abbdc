//! Webhook executor.
//!
//! POSTs the item as JSON to a configured URL and expects `{success, message}` back. A non-2xx
//! status is an outage (`RemoteUnavailable`); a 2xx with `success: false` is a refusal.

use super::types::{ActionExecutor, ActionReport};
use crate::error::SyncError;
use crate::feed::CandidateItem;

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

pub struct WebhookExecutor {
    endpoint: Url,
    http_client: reqwest::Client,
    request_timeout: Duration,
}

impl WebhookExecutor {
    pub fn new(endpoint: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        Ok(Self {
            endpoint,
            http_client: reqwest::Client::new(),
            request_timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ActionExecutor for WebhookExecutor {
    async fn perform(&self, item: &CandidateItem) -> Result<ActionReport, SyncError> {
        tracing::debug!("Posting item {} to {}", item.id, self.endpoint);

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .timeout(self.request_timeout)
            .json(item)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::RemoteUnavailable(format!(
                "action target returned {} for item {}",
                status, item.id
            )));
        }

        let body = response.bytes().await?;
        let report: ActionReport = serde_json::from_slice(&body)?;

        if !report.success {
            tracing::info!("Action target declined item {}: {}", item.id, report.message);
        }
        Ok(report)
    }
}
