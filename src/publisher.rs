//! Publisher Loop
//!
//! Drives the sampling cadence: every interval it runs all samplers, builds
//! one dashboard update and publishes it through the hub.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::sampler::render::Payload;
use crate::sampler::{Sampler, SamplerError};
use crate::websocket::{Hub, Update};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Configuration for the publisher loop
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Time between sampling cycles
    pub interval: Duration,
    /// Longest a single sampler may take before its targets go out blank
    pub sample_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            sample_timeout: Duration::from_secs(4),
        }
    }
}

/// Periodic sampler driver
pub struct Publisher {
    hub: Arc<Hub>,
    samplers: Vec<Box<dyn Sampler>>,
    config: PublisherConfig,
}

impl Publisher {
    pub fn new(hub: Arc<Hub>, samplers: Vec<Box<dyn Sampler>>, config: PublisherConfig) -> Self {
        Self {
            hub,
            samplers,
            config,
        }
    }

    /// Run one sampling cycle and assemble the update
    ///
    /// Samplers run concurrently, each bounded by `sample_timeout`. A failing
    /// or hung sampler is logged and its targets are published blank; it
    /// never aborts the cycle.
    pub async fn collect(&self) -> Update {
        let limit = self.config.sample_timeout;
        let results = join_all(self.samplers.iter().map(|sampler| async move {
            tokio::time::timeout(limit, sampler.sample())
                .await
                .unwrap_or_else(|_| Err(SamplerError::Timeout(limit)))
        }))
        .await;

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let mut payload = Payload::new(&timestamp);

        for (sampler, result) in self.samplers.iter().zip(results) {
            match result {
                Ok(fragments) => {
                    for target in sampler.targets() {
                        let html = fragments
                            .iter()
                            .find(|fragment| fragment.target == *target)
                            .map(|fragment| fragment.html.as_str())
                            .unwrap_or_default();
                        payload.section(target, html);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        sampler = sampler.name(),
                        error = %e,
                        "Sampler failed, publishing blank section"
                    );
                    for target in sampler.targets() {
                        payload.section(target, "");
                    }
                }
            }
        }

        payload.finish()
    }

    /// Publish one update per interval until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            sample_timeout_ms = self.config.sample_timeout.as_millis() as u64,
            samplers = self.samplers.len(),
            "Publisher started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let update = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                update = self.collect() => update,
            };

            let report = self.hub.publish(update);
            tracing::debug!(
                delivered = report.delivered,
                dropped = report.dropped,
                closed = report.closed,
                "Published dashboard update"
            );
        }

        tracing::info!("Publisher stopped");
    }

    /// Start the loop as a background task
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
