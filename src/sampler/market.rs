//! Weather and crypto price sampler
//!
//! Polls an aggregator service that returns current weather for a location
//! and the latest prices of a few crypto assets in one JSON document.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::render::escape;
use super::{Fragment, Sampler, SamplerError};

/// Aggregator API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Aggregator endpoint, queried as `{url}?location={location}`
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_location() -> String {
    "Kudelstaart".to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: default_url(),
            location: default_location(),
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MarketResponse {
    #[serde(default, rename = "weatherbucket")]
    weather: WeatherBucket,
    #[serde(default)]
    crypto: Crypto,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherBucket {
    #[serde(default)]
    location: String,
    #[serde(default)]
    temp: String,
    #[serde(default, rename = "weatherDesc")]
    weather_desc: String,
}

#[derive(Debug, Default, Deserialize)]
struct Crypto {
    #[serde(default)]
    asset: HashMap<String, CryptoAsset>,
}

#[derive(Debug, Default, Deserialize)]
struct CryptoAsset {
    #[serde(default, rename = "lastPrice")]
    last_price: String,
}

impl MarketResponse {
    fn last_price(&self, symbol: &str) -> &str {
        self.crypto
            .asset
            .get(symbol)
            .map(|asset| asset.last_price.as_str())
            .unwrap_or_default()
    }

    fn into_fragments(self) -> Vec<Fragment> {
        vec![
            Fragment::new("temp", escape(&self.weather.temp)),
            Fragment::new("weather", escape(&self.weather.weather_desc)),
            Fragment::new("location", escape(&self.weather.location)),
            Fragment::new("btc", escape(self.last_price("BTCUSDT"))),
            Fragment::new("eth", escape(self.last_price("ETHUSDT"))),
        ]
    }
}

/// Weather and price readings from the aggregator
pub struct MarketSampler {
    client: Client,
    config: MarketConfig,
}

impl MarketSampler {
    pub fn new(config: MarketConfig) -> Result<Self, SamplerError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    fn request_url(&self) -> String {
        format!(
            "{}?location={}",
            self.config.url,
            urlencoding::encode(&self.config.location)
        )
    }
}

#[async_trait]
impl Sampler for MarketSampler {
    fn name(&self) -> &str {
        "market"
    }

    fn targets(&self) -> &[&'static str] {
        &["temp", "weather", "location", "btc", "eth"]
    }

    async fn sample(&self) -> Result<Vec<Fragment>, SamplerError> {
        let response = self.client.get(self.request_url()).send().await?;

        if !response.status().is_success() {
            return Err(SamplerError::Status(response.status()));
        }

        let body: MarketResponse = response.json().await?;
        Ok(body.into_fragments())
    }
}
