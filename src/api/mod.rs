//! Hostpulse HTTP Server
//!
//! HTTP layer for the dashboard, built with Axum.
//!
//! # Endpoints
//!
//! ## WebSocket
//! - `GET /ws` - Live dashboard update stream
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Hub status
//!
//! ## Static assets
//! - Any other path is served from the configured static directory
//!
//! # Example
//!
//! ```rust,ignore
//! use hostpulse::api::{bind, serve, AppState};
//! use hostpulse::config::ServerConfig;
//! use hostpulse::websocket::{Hub, HubConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let hub = Arc::new(Hub::new(HubConfig::default()));
//!     let listener = bind(&config).await?;
//!
//!     let state = AppState::new(hub, config, CancellationToken::new());
//!     serve(listener, state).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::websocket::websocket_handler;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let static_files = ServeDir::new(&state.config.static_dir);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .route("/ws", get(websocket_handler))
        .nest("/health", health_routes)
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Bind the listening socket
///
/// Failure here is fatal for the process.
pub async fn bind(config: &ServerConfig) -> ApiResult<TcpListener> {
    let addr = config.addr();
    TcpListener::bind(&addr)
        .await
        .map_err(|source| ApiError::Bind { addr, source })
}

/// Serve requests until shutdown
///
/// Ctrl+C or SIGTERM cancels `state.shutdown`, which also stops the
/// publisher and every open connection.
pub async fn serve(listener: TcpListener, state: AppState) -> ApiResult<()> {
    let shutdown = state.shutdown.clone();
    let router = build_router(state);

    tracing::info!("Hostpulse listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Hostpulse shut down gracefully");
    Ok(())
}

/// Wait for a shutdown signal, then cancel `shutdown`
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::{Hub, HubConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, Arc<Hub>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>dashboard</h1>").unwrap();

        let config = ServerConfig {
            static_dir: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };
        let hub = Arc::new(Hub::new(HubConfig::default()));
        let state = AppState::new(Arc::clone(&hub), config, CancellationToken::new());

        (build_router(state), hub, dir)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _hub, _dir) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _hub, _dir) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["subscribers"], 0);
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let (app, _hub, _dir) = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<h1>dashboard</h1>");
    }

    #[tokio::test]
    async fn test_static_missing_file() {
        let (app, _hub, _dir) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/missing.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ws_without_upgrade_is_rejected() {
        let (app, hub, _dir) = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..Default::default()
        };

        let result = bind(&config).await;
        assert!(matches!(result, Err(ApiError::Bind { .. })));
    }
}
