//! DefiLlama Stablecoins Client
//!
//! Reads the full pegged-asset listing in one request. Matching against a
//! token's lookup key happens in the Supply Fetcher.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;

use crate::domain::{FetchError, Origin};
use crate::ports::{PeggedAsset, SupplyPort};
use super::types::StablecoinsResponse;

/// Default stablecoins listing endpoint
pub const DEFAULT_LLAMA_URL: &str = "https://stablecoins.llama.fi/stablecoins?includePrices=false";

/// Aggregator client configuration
#[derive(Debug, Clone)]
pub struct LlamaConfig {
    /// Full listing URL, query string included
    pub url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for LlamaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LLAMA_URL.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("stablewatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlamaClient {
    config: LlamaConfig,
    http: Client,
}

impl LlamaClient {
    pub fn new(config: LlamaConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, http })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn fetch_listing(&self) -> Result<StablecoinsResponse, FetchError> {
        let response = self
            .http
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(Origin::Aggregator, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::provider(Origin::Aggregator, format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(Origin::Aggregator, e))?;

        serde_json::from_str(&body)
            .map_err(|e| FetchError::parse(Origin::Aggregator, format!("Failed to parse listing: {}", e)))
    }
}

#[async_trait]
impl SupplyPort for LlamaClient {
    async fn pegged_assets(&self) -> Result<Vec<PeggedAsset>, FetchError> {
        let listing = self.fetch_listing().await?;
        tracing::debug!("Aggregator returned {} pegged assets", listing.pegged_assets.len());

        Ok(listing
            .pegged_assets
            .into_iter()
            .map(|record| record.into_asset())
            .collect())
    }
}
