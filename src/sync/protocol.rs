//! Control API Definitions
//!
//! Endpoints and DTOs for the worker's HTTP control surface.

use super::types::FetchOutcome;
use crate::breaker::BreakerSnapshot;
use crate::feed::ItemStats;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_HEALTH: &str = "/health";
pub const ENDPOINT_SYNC: &str = "/sync";
pub const ENDPOINT_BREAKERS: &str = "/breakers";
pub const ENDPOINT_BREAKER_RESET: &str = "/breakers/:name/reset";
pub const ENDPOINT_TOPICS: &str = "/topics";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub instance: String,
    pub last_version: Option<String>,
    pub processed_count: usize,
    pub cycle_running: bool,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<FetchOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ItemStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BreakersResponse {
    pub breakers: Vec<BreakerSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetBreakerResponse {
    pub name: String,
    pub reset: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub topics: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTopicsRequest {
    pub topics: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTopicsResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
