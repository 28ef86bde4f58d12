//! Application State
//!
//! Shared state accessible by all handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::websocket::Hub;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Broadcast hub shared with the publisher loop
    pub hub: Arc<Hub>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Cancelled on shutdown; every connection handler gets a child token
    pub shutdown: CancellationToken,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, config: ServerConfig, shutdown: CancellationToken) -> Self {
        Self {
            hub,
            config: Arc::new(config),
            shutdown,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
