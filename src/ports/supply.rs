//! Stablecoin aggregator port

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::FetchError;

/// One stablecoin record from the aggregator listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeggedAsset {
    pub name: String,
    pub symbol: String,
    /// Circulating USD-pegged quantity, if the record carries one
    pub circulating_usd: Option<Decimal>,
}

impl PeggedAsset {
    /// Exact, case-sensitive match on name or symbol
    pub fn matches(&self, lookup_key: &str) -> bool {
        self.name == lookup_key || self.symbol == lookup_key
    }
}

/// Source of circulating-supply data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SupplyPort: Send + Sync {
    /// Fetch the full pegged-asset listing (one request)
    async fn pegged_assets(&self) -> Result<Vec<PeggedAsset>, FetchError>;
}
