//! Data Transfer Objects
//!
//! Response bodies for the JSON endpoints.

use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,
    /// Currently connected viewers
    pub subscribers: usize,
    /// Updates published since startup
    pub published: u64,
    /// Per-subscriber deliveries dropped because a queue was full
    pub dropped: u64,
    /// Per-subscriber queue capacity
    pub buffer_capacity: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
