//! DefiLlama stablecoins API wire types

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use crate::ports::PeggedAsset;

/// `GET /stablecoins` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StablecoinsResponse {
    pub pegged_assets: Vec<PeggedAssetRecord>,
}

/// One entry of `peggedAssets`. Only the fields we read are modeled.
#[derive(Debug, Clone, Deserialize)]
pub struct PeggedAssetRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub circulating: Option<Circulating>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circulating {
    #[serde(default, rename = "peggedUSD")]
    pub pegged_usd: Option<serde_json::Number>,
}

impl PeggedAssetRecord {
    /// Circulating USD amount as an exact decimal
    pub fn circulating_usd(&self) -> Option<Decimal> {
        let number = self.circulating.as_ref()?.pegged_usd.as_ref()?;
        parse_number(number)
    }

    pub fn into_asset(self) -> PeggedAsset {
        let circulating_usd = self.circulating_usd();
        PeggedAsset {
            name: self.name.unwrap_or_default(),
            symbol: self.symbol.unwrap_or_default(),
            circulating_usd,
        }
    }
}

/// JSON numbers print in their shortest round-trip form, so the decimal
/// literal survives. Very large values come out in exponent notation.
fn parse_number(number: &serde_json::Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
