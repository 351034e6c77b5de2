//! Etherscan / BscScan Client
//!
//! One client serves both chains; each chain has its own endpoint and key.
//! A request reads exactly one page of `account/tokentx` history.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use crate::domain::{Chain, FetchError, Origin, RawTransaction};
use crate::ports::{ExplorerPort, PageRequest};
use super::types::TokenTxResponse;

/// API endpoint and key for one chain's explorer
#[derive(Clone)]
pub struct ExplorerEndpoint {
    pub api_url: String,
    pub api_key: String,
}

impl ExplorerEndpoint {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

// Keeps the key out of logs
impl std::fmt::Debug for ExplorerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorerEndpoint")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Explorer client configuration
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub ethereum: ExplorerEndpoint,
    pub bsc: ExplorerEndpoint,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ExplorerConfig {
    /// Default endpoints with the given keys
    pub fn with_keys(ethereum_key: impl Into<String>, bsc_key: impl Into<String>) -> Self {
        Self {
            ethereum: ExplorerEndpoint::new(Chain::Ethereum.default_api_url(), ethereum_key),
            bsc: ExplorerEndpoint::new(Chain::Bsc.default_api_url(), bsc_key),
            timeout: Duration::from_secs(10),
            user_agent: concat!("stablewatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn endpoint(&self, chain: Chain) -> &ExplorerEndpoint {
        match chain {
            Chain::Ethereum => &self.ethereum,
            Chain::Bsc => &self.bsc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExplorerClient {
    config: ExplorerConfig,
    http: Client,
}

impl ExplorerClient {
    pub fn new(config: ExplorerConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, http })
    }

    /// GET request for one page of a contract's transfers
    fn tokentx_request(&self, request: &PageRequest) -> RequestBuilder {
        let endpoint = self.config.endpoint(request.chain);
        let start_time = request.start_time.to_string();
        let page = request.page.to_string();
        let offset = request.page_size.to_string();

        self.http.get(&endpoint.api_url).query(&[
            ("module", "account"),
            ("action", "tokentx"),
            ("contractaddress", request.contract_address.as_str()),
            ("starttime", start_time.as_str()),
            ("page", page.as_str()),
            ("offset", offset.as_str()),
            ("sort", "desc"),
            ("apikey", endpoint.api_key.as_str()),
        ])
    }
}

#[async_trait]
impl ExplorerPort for ExplorerClient {
    async fn token_transfers(&self, request: &PageRequest) -> Result<Vec<RawTransaction>, FetchError> {
        let origin = Origin::Explorer { chain: request.chain, page: request.page };

        let response = self
            .tokentx_request(request)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(origin, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::provider(origin, format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(origin, e))?;

        let parsed: TokenTxResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::parse(origin, format!("Failed to parse tokentx response: {}", e)))?;

        parsed.into_page(origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn client() -> ExplorerClient {
        ExplorerClient::new(ExplorerConfig::with_keys("eth-key", "bsc-key")).unwrap()
    }

    fn page_request(chain: Chain) -> PageRequest {
        PageRequest {
            chain,
            contract_address: "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string(),
            start_time: 1_700_000_000,
            page: 2,
            page_size: 20,
        }
    }

    #[test]
    fn test_request_query_parameters() {
        let request = client()
            .tokentx_request(&page_request(Chain::Ethereum))
            .build()
            .unwrap();

        assert_eq!(request.url().host_str(), Some("api.etherscan.io"));
        let query: HashMap<String, String> = request.url().query_pairs().into_owned().collect();
        assert_eq!(query["module"], "account");
        assert_eq!(query["action"], "tokentx");
        assert_eq!(query["contractaddress"], "0xdAC17F958D2ee523a2206206994597C13D831ec7");
        assert_eq!(query["starttime"], "1700000000");
        assert_eq!(query["page"], "2");
        assert_eq!(query["offset"], "20");
        assert_eq!(query["sort"], "desc");
        assert_eq!(query["apikey"], "eth-key");
    }

    #[test]
    fn test_each_chain_uses_its_own_endpoint_and_key() {
        let request = client()
            .tokentx_request(&page_request(Chain::Bsc))
            .build()
            .unwrap();

        assert_eq!(request.url().host_str(), Some("api.bscscan.com"));
        assert!(request.url().query_pairs().any(|(k, v)| k == "apikey" && v == "bsc-key"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ExplorerConfig::with_keys("secret-eth", "secret-bsc");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-eth"));
        assert!(rendered.contains("api.etherscan.io"));
    }
}
