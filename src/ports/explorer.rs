//! Chain explorer port

use async_trait::async_trait;

use crate::domain::{Chain, FetchError, RawTransaction};

/// One page of token-transfer history for a contract, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub chain: Chain,
    pub contract_address: String,
    /// Window lower bound, unix seconds
    pub start_time: u64,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

/// Source of token-transfer history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExplorerPort: Send + Sync {
    /// Fetch a single page. A provider "no data" answer is an `Err`.
    async fn token_transfers(&self, request: &PageRequest)
        -> Result<Vec<RawTransaction>, FetchError>;
}
