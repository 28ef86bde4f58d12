//! Metric Samplers
//!
//! Each sampler reads one slice of host or external state and renders it as
//! HTML fragments addressed to dashboard elements:
//! - System overview (OS, host, processes, memory)
//! - Root disk usage
//! - CPU model and per-core usage
//! - Load averages
//! - Temperature sensors
//! - Docker containers
//! - Weather and crypto prices (external aggregator API)

mod docker;
mod hardware;
mod market;
pub mod render;

pub use docker::DockerSampler;
pub use hardware::{CpuSampler, DiskSampler, LoadSampler, SensorSampler, SystemSampler};
pub use market::{MarketConfig, MarketSampler};

use async_trait::async_trait;

/// Common trait for all metric sources
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Dashboard element ids this sampler fills, in payload order
    fn targets(&self) -> &[&'static str];

    /// Take one reading
    ///
    /// Targets missing from the returned fragments are published blank.
    async fn sample(&self) -> Result<Vec<Fragment>, SamplerError>;
}

/// Rendered HTML for one dashboard element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub target: &'static str,
    pub html: String,
}

impl Fragment {
    pub fn new(target: &'static str, html: impl Into<String>) -> Self {
        Self {
            target,
            html: html.into(),
        }
    }
}

/// Errors that can occur while sampling
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("{0} unavailable")]
    Unavailable(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sampling task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("No reading within {0:?}")]
    Timeout(std::time::Duration),
}

/// Run a blocking OS read off the async workers
pub(crate) async fn blocking<T, F>(read: F) -> Result<T, SamplerError>
where
    F: FnOnce() -> Result<T, SamplerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(read).await?
}

/// The standard dashboard sampler set, in payload order
pub fn default_samplers(market: &MarketConfig) -> Result<Vec<Box<dyn Sampler>>, SamplerError> {
    let mut samplers: Vec<Box<dyn Sampler>> = Vec::new();

    if market.enabled {
        samplers.push(Box::new(MarketSampler::new(market.clone())?));
    }

    samplers.push(Box::new(SystemSampler));
    samplers.push(Box::new(CpuSampler::new()));
    samplers.push(Box::new(LoadSampler));
    samplers.push(Box::new(SensorSampler));
    samplers.push(Box::new(DockerSampler::default()));
    samplers.push(Box::new(DiskSampler::default()));

    Ok(samplers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_samplers_without_market() {
        let market = MarketConfig {
            enabled: false,
            ..Default::default()
        };
        let samplers = default_samplers(&market).unwrap();
        let targets: Vec<_> = samplers.iter().flat_map(|s| s.targets().to_vec()).collect();

        assert_eq!(
            targets,
            vec!["system-data", "cpu-data", "load", "systemp", "dock", "disk-data"]
        );
    }

    #[test]
    fn test_default_samplers_with_market() {
        let samplers = default_samplers(&MarketConfig::default()).unwrap();
        assert_eq!(samplers[0].name(), "market");
        assert_eq!(samplers.len(), 7);
    }

    #[test]
    fn test_error_display() {
        let err = SamplerError::Unavailable("root filesystem".to_string());
        assert_eq!(err.to_string(), "root filesystem unavailable");

        let err = SamplerError::Timeout(std::time::Duration::from_secs(4));
        assert_eq!(err.to_string(), "No reading within 4s");
    }

    #[tokio::test]
    async fn test_blocking_propagates_error() {
        let result: Result<(), _> =
            blocking(|| Err(SamplerError::Command("boom".to_string()))).await;
        assert!(matches!(result, Err(SamplerError::Command(_))));
    }
}
