//! Health Routes
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health - Hub status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.hub.stats();

    let status = if state.shutdown.is_cancelled() {
        "shutting_down"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        subscribers: stats.subscribers,
        published: stats.published,
        dropped: stats.dropped,
        buffer_capacity: state.hub.buffer_capacity(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::websocket::{Hub, HubConfig, Update};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_full_health_reports_hub_stats() {
        let hub = Arc::new(Hub::new(HubConfig::default()));
        let _sub = hub.subscribe();
        hub.publish(Update::from("x"));

        let shutdown = CancellationToken::new();
        let state = Arc::new(AppState::new(Arc::clone(&hub), ServerConfig::default(), shutdown.clone()));

        let Json(health) = full_health(State(Arc::clone(&state))).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.subscribers, 1);
        assert_eq!(health.published, 1);
        assert_eq!(health.buffer_capacity, 20);

        shutdown.cancel();
        let Json(health) = full_health(State(state)).await;
        assert_eq!(health.status, "shutting_down");
    }
}
