use super::orchestrator::SyncOrchestrator;
use super::protocol::*;
use crate::breaker::BreakerRegistry;
use crate::error::SyncError;
use crate::feed::{ItemStats, TopicsClient};

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

/// Builds the control surface with its collaborators attached as extensions.
pub fn control_router(
    orchestrator: Arc<SyncOrchestrator>,
    breakers: Arc<BreakerRegistry>,
    topics: Arc<TopicsClient>,
) -> Router {
    Router::new()
        .route(ENDPOINT_HEALTH, get(handle_health))
        .route(ENDPOINT_SYNC, post(handle_sync))
        .route(ENDPOINT_BREAKERS, get(handle_list_breakers))
        .route(ENDPOINT_BREAKER_RESET, post(handle_reset_breaker))
        .route(ENDPOINT_TOPICS, get(handle_get_topics).put(handle_put_topics))
        .layer(Extension(orchestrator))
        .layer(Extension(breakers))
        .layer(Extension(topics))
}

pub async fn handle_health(
    Extension(orchestrator): Extension<Arc<SyncOrchestrator>>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            instance: orchestrator.identity().to_string(),
            last_version: orchestrator.last_version(),
            processed_count: orchestrator.ledger().len(),
            cycle_running: orchestrator.is_cycle_running(),
        }),
    )
}

/// User-triggered sync. Failures go into the body; the worker keeps running either way.
pub async fn handle_sync(
    Extension(orchestrator): Extension<Arc<SyncOrchestrator>>,
) -> (StatusCode, Json<SyncResponse>) {
    match orchestrator.fetch_new_items().await {
        Ok(outcome) => {
            let stats = ItemStats::from_items(&outcome.items);
            (
                StatusCode::OK,
                Json(SyncResponse {
                    success: true,
                    outcome: Some(outcome),
                    stats: Some(stats),
                    error: None,
                    retry_after_ms: None,
                }),
            )
        }
        Err(e) => {
            tracing::warn!("Manual sync failed: {}", e);
            let status = match &e {
                SyncError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
                SyncError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(SyncResponse {
                    success: false,
                    outcome: None,
                    stats: None,
                    retry_after_ms: e.retry_after().map(|after| after.as_millis() as u64),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_list_breakers(
    Extension(breakers): Extension<Arc<BreakerRegistry>>,
) -> (StatusCode, Json<BreakersResponse>) {
    (
        StatusCode::OK,
        Json(BreakersResponse {
            breakers: breakers.snapshots(),
        }),
    )
}

pub async fn handle_reset_breaker(
    Extension(breakers): Extension<Arc<BreakerRegistry>>,
    Path(name): Path<String>,
) -> (StatusCode, Json<ResetBreakerResponse>) {
    if breakers.reset_by_name(&name) {
        (StatusCode::OK, Json(ResetBreakerResponse { name, reset: true }))
    } else {
        tracing::debug!("Reset requested for unknown breaker {}", name);
        (
            StatusCode::NOT_FOUND,
            Json(ResetBreakerResponse { name, reset: false }),
        )
    }
}

pub async fn handle_get_topics(
    Extension(topics): Extension<Arc<TopicsClient>>,
) -> (StatusCode, Json<TopicsResponse>) {
    (
        StatusCode::OK,
        Json(TopicsResponse {
            topics: topics.fetch_topics().await,
        }),
    )
}

pub async fn handle_put_topics(
    Extension(topics): Extension<Arc<TopicsClient>>,
    Json(req): Json<UpdateTopicsRequest>,
) -> (StatusCode, Json<UpdateTopicsResponse>) {
    match topics.upload_topics(&req.topics).await {
        Ok(()) => (
            StatusCode::OK,
            Json(UpdateTopicsResponse {
                success: true,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to upload topics: {}", e);
            let status = match &e {
                SyncError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(UpdateTopicsResponse {
                    success: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
