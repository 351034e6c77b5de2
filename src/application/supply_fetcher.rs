//! Supply Fetcher
//!
//! One aggregator request per call, matched against the token's lookup key.
//! Every failure becomes a zero reading flagged failed plus the typed error.

use std::sync::Arc;

use crate::domain::{FetchError, Origin, SupplyReading, TokenSpec};
use crate::ports::SupplyPort;
use super::rate_limiter::{Provider, ProviderLimiters};

/// Reading plus the error that explains a failed one
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyOutcome {
    pub reading: SupplyReading,
    pub error: Option<FetchError>,
}

pub struct SupplyFetcher<S: SupplyPort> {
    aggregator: Arc<S>,
    limiters: ProviderLimiters,
}

impl<S: SupplyPort> SupplyFetcher<S> {
    pub fn new(aggregator: Arc<S>, limiters: ProviderLimiters) -> Self {
        Self { aggregator, limiters }
    }

    pub async fn fetch(&self, token: &TokenSpec) -> SupplyOutcome {
        match self.lookup(token).await {
            Ok(reading) => SupplyOutcome { reading, error: None },
            Err(error) => {
                tracing::warn!("{} supply unavailable: {}", token.symbol, error);
                SupplyOutcome {
                    reading: SupplyReading::failed(*token),
                    error: Some(error),
                }
            }
        }
    }

    async fn lookup(&self, token: &TokenSpec) -> Result<SupplyReading, FetchError> {
        self.limiters.acquire(Provider::Aggregator).await;
        let assets = self.aggregator.pegged_assets().await?;

        let asset = assets
            .iter()
            .find(|a| a.matches(token.aggregator_lookup_key))
            .ok_or_else(|| FetchError::NoMatch {
                lookup_key: token.aggregator_lookup_key.to_string(),
            })?;

        let supply = asset.circulating_usd.ok_or_else(|| {
            FetchError::parse(
                Origin::Aggregator,
                format!("'{}' has no circulating.peggedUSD", asset.name),
            )
        })?;

        if supply.is_sign_negative() {
            return Err(FetchError::parse(
                Origin::Aggregator,
                format!("'{}' reports negative supply {}", asset.name, supply),
            ));
        }

        tracing::debug!("{} circulating supply: {}", token.symbol, supply);
        Ok(SupplyReading::ok(*token, supply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{USDC, USDT};
    use crate::ports::supply::{MockSupplyPort, PeggedAsset};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn asset(name: &str, symbol: &str, circulating: Option<Decimal>) -> PeggedAsset {
        PeggedAsset {
            name: name.into(),
            symbol: symbol.into(),
            circulating_usd: circulating,
        }
    }

    fn fetcher_with(listing: Result<Vec<PeggedAsset>, FetchError>) -> SupplyFetcher<MockSupplyPort> {
        let mut port = MockSupplyPort::new();
        port.expect_pegged_assets()
            .times(1)
            .returning(move || listing.clone());
        SupplyFetcher::new(Arc::new(port), ProviderLimiters::default())
    }

    #[tokio::test]
    async fn test_tether_supply_matches_by_name() {
        let fetcher = fetcher_with(Ok(vec![asset("Tether", "USDT", Some(dec!(143171664723.56)))]));

        let outcome = fetcher.fetch(&USDT).await;

        assert_eq!(outcome.reading.total_supply, dec!(143171664723.56));
        assert!(!outcome.reading.failed);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_matches_by_symbol() {
        let fetcher = fetcher_with(Ok(vec![
            asset("Tether", "USDT", Some(dec!(1))),
            asset("Circle Dollar", "USD Coin", Some(dec!(42))),
        ]));

        let outcome = fetcher.fetch(&USDC).await;

        assert_eq!(outcome.reading.total_supply, dec!(42));
    }

    #[tokio::test]
    async fn test_no_match_is_flagged_failed() {
        let fetcher = fetcher_with(Ok(vec![asset("tether", "usdt", Some(dec!(1)))]));

        let outcome = fetcher.fetch(&USDT).await;

        assert!(outcome.reading.failed);
        assert!(outcome.reading.total_supply.is_zero());
        assert_eq!(
            outcome.error,
            Some(FetchError::NoMatch { lookup_key: "Tether".into() })
        );
    }

    #[tokio::test]
    async fn test_network_error_is_flagged_failed() {
        let fetcher = fetcher_with(Err(FetchError::network(Origin::Aggregator, "connection refused")));

        let outcome = fetcher.fetch(&USDT).await;

        assert!(outcome.reading.failed);
        assert!(outcome.error.unwrap().is_network());
    }

    #[tokio::test]
    async fn test_missing_circulating_is_parse_error() {
        let fetcher = fetcher_with(Ok(vec![asset("Tether", "USDT", None)]));

        let outcome = fetcher.fetch(&USDT).await;

        assert!(outcome.reading.failed);
        assert!(matches!(outcome.error, Some(FetchError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_true_zero_supply_is_not_failed() {
        let fetcher = fetcher_with(Ok(vec![asset("Tether", "USDT", Some(Decimal::ZERO))]));

        let outcome = fetcher.fetch(&USDT).await;

        assert!(!outcome.reading.failed);
        assert!(outcome.reading.total_supply.is_zero());
    }
}
