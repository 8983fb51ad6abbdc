//! Topic selection stored next to the feed.
//!
//! The producer reads this object to decide what to collect. Reads never fail: a missing or
//! unreadable object, or an unreachable store, yields the built-in default list.

use crate::breaker::{CircuitBreaker, call_with};
use crate::error::SyncError;
use crate::store::ObjectStore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_TOPICS: &[&str] = &[
    "AI",
    "Crypto",
    "Bitcoin",
    "Ethereum",
    "Motivation",
    "Machine Learning",
    "Blockchain",
    "Self-Improvement",
    "Tech Innovation",
    "Programming",
    "Science",
    "Gaming",
    "Environment",
    "Finance",
    "Health & Wellness",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsDocument {
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

pub fn default_topics() -> Vec<String> {
    DEFAULT_TOPICS.iter().map(|topic| topic.to_string()).collect()
}

pub struct TopicsClient {
    store: Arc<dyn ObjectStore>,
    topics_key: String,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl TopicsClient {
    pub fn new(store: Arc<dyn ObjectStore>, topics_key: &str) -> Self {
        Self {
            store,
            topics_key: topics_key.to_string(),
            breaker: None,
        }
    }

    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub async fn fetch_topics(&self) -> Vec<String> {
        let bytes = match call_with(self.breaker.as_deref(), || {
            self.store.get_object(&self.topics_key)
        })
        .await
        {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!("Topics file not found, returning default topics");
                return default_topics();
            }
            Err(e) => {
                tracing::warn!("Failed to fetch topics: {}", e);
                return default_topics();
            }
        };

        match serde_json::from_slice::<TopicsDocument>(&bytes) {
            Ok(TopicsDocument {
                topics: Some(topics),
                ..
            }) => topics,
            Ok(_) => default_topics(),
            Err(e) => {
                tracing::warn!("Failed to decode topics: {}", e);
                default_topics()
            }
        }
    }

    pub async fn upload_topics(&self, topics: &[String]) -> Result<(), SyncError> {
        let document = TopicsDocument {
            topics: Some(topics.to_vec()),
            last_updated: Some(chrono::Utc::now().to_rfc3339()),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        call_with(self.breaker.as_deref(), || {
            self.store.put_object(&self.topics_key, bytes)
        })
        .await?;
        tracing::info!("Uploaded {} topics", topics.len());
        Ok(())
    }
}
