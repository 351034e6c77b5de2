//! Token Poller
//!
//! Supply lookup plus per-chain transfer fetch and ranking for one token.
//! The three run concurrently; a failure in one never discards the others.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;

use crate::domain::{
    rank_large_transactions, Chain, FetchError, Origin, PollResult, RankPolicy, TokenSpec,
};
use crate::ports::{ExplorerPort, SupplyPort};
use super::rate_limiter::ProviderLimiters;
use super::supply_fetcher::SupplyFetcher;
use super::tx_fetcher::{ChainFetch, PaginationPolicy, TransactionFetcher};

/// Default look-back window for transfers
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Knobs shared by every token's poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub rank: RankPolicy,
    pub pagination: PaginationPolicy,
    pub window: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            rank: RankPolicy::default(),
            pagination: PaginationPolicy::default(),
            window: DEFAULT_WINDOW,
        }
    }
}

pub struct TokenPoller<S: SupplyPort, E: ExplorerPort> {
    supply: SupplyFetcher<S>,
    transactions: TransactionFetcher<E>,
    settings: PollSettings,
}

impl<S: SupplyPort, E: ExplorerPort> TokenPoller<S, E> {
    pub fn new(aggregator: Arc<S>, explorer: Arc<E>, limiters: ProviderLimiters, settings: PollSettings) -> Self {
        Self {
            supply: SupplyFetcher::new(aggregator, limiters.clone()),
            transactions: TransactionFetcher::new(explorer, limiters, settings.pagination),
            settings,
        }
    }

    /// Poll one token. Never fails; problems land in `PollResult::errors`.
    pub async fn poll(&self, token: TokenSpec) -> PollResult {
        let since = (Utc::now().timestamp().max(0) as u64).saturating_sub(self.settings.window.as_secs());

        let (supply, ethereum, bsc) = tokio::join!(
            self.supply.fetch(&token),
            self.chain(&token, Chain::Ethereum, since),
            self.chain(&token, Chain::Bsc, since),
        );

        let mut errors = Vec::new();
        errors.extend(supply.error);

        let mut large_txs = BTreeMap::new();
        for (chain, fetch) in [(Chain::Ethereum, ethereum), (Chain::Bsc, bsc)] {
            let ranked = rank_large_transactions(&fetch.transactions, &self.settings.rank);
            tracing::debug!(
                "{} on {}: {} transfers fetched, {} large",
                token.symbol,
                chain,
                fetch.transactions.len(),
                ranked.len()
            );
            errors.extend(fetch.errors);
            large_txs.insert(chain, ranked);
        }

        PollResult {
            token,
            supply: supply.reading,
            large_txs,
            errors,
        }
    }

    async fn chain(&self, token: &TokenSpec, chain: Chain, since: u64) -> ChainFetch {
        match token.contract_address(chain) {
            Some(contract) => self.transactions.fetch(chain, contract, since).await,
            None => ChainFetch {
                errors: vec![FetchError::parse(
                    Origin::Explorer { chain, page: 0 },
                    format!("{} has no contract configured on {}", token.symbol, chain),
                )],
                ..ChainFetch::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::tests::raw_tx;
    use crate::domain::{USDT, USDC};
    use crate::ports::mocks::{MockAggregator, MockExplorer};
    use crate::ports::PeggedAsset;
    use rust_decimal_macros::dec;

    fn tether_listing() -> Vec<PeggedAsset> {
        vec![PeggedAsset {
            name: "Tether".into(),
            symbol: "USDT".into(),
            circulating_usd: Some(dec!(143171664723.56)),
        }]
    }

    fn poller(aggregator: MockAggregator, explorer: MockExplorer) -> TokenPoller<MockAggregator, MockExplorer> {
        TokenPoller::new(
            Arc::new(aggregator),
            Arc::new(explorer),
            ProviderLimiters::default(),
            PollSettings::default(),
        )
    }

    fn fresh(hash: &str, whole_tokens: u64) -> crate::domain::RawTransaction {
        let mut tx = raw_tx(hash, &format!("{}000000", whole_tokens), 6);
        tx.timestamp = Utc::now().timestamp() as u64;
        tx
    }

    #[tokio::test]
    async fn test_large_transactions_scenario() {
        let explorer = MockExplorer::new().with_page(
            Chain::Ethereum,
            1,
            Ok(vec![fresh("0x1", 5_000_000), fresh("0x2", 800_000), fresh("0x3", 2_000_000)]),
        );
        let poller = poller(MockAggregator::new().with_listing(tether_listing()), explorer.clone());

        let result = poller.poll(USDT).await;

        assert_eq!(
            result.large_txs_on(Chain::Ethereum).values(),
            vec![dec!(5000000), dec!(2000000)]
        );
        assert_eq!(explorer.calls_for(Chain::Ethereum, USDT.contract_address(Chain::Ethereum).unwrap()), vec![1, 2]);
        assert_eq!(result.supply.total_supply, dec!(143171664723.56));
        assert!(result.is_clean());
    }

    #[tokio::test]
    async fn test_ethereum_failure_keeps_bsc_results() {
        let explorer = MockExplorer::new()
            .with_page(
                Chain::Ethereum,
                1,
                Err(FetchError::network(Origin::Explorer { chain: Chain::Ethereum, page: 1 }, "timeout")),
            )
            .with_page(Chain::Bsc, 1, Ok(vec![fresh("0xb", 3_000_000)]));
        let poller = poller(MockAggregator::new().with_listing(tether_listing()), explorer);

        let result = poller.poll(USDT).await;

        assert!(result.chain_failed(Chain::Ethereum));
        assert!(!result.chain_failed(Chain::Bsc));
        assert_eq!(result.large_txs_on(Chain::Bsc).values(), vec![dec!(3000000)]);
        assert!(result.large_txs_on(Chain::Ethereum).is_empty());
        assert!(!result.supply.failed);
    }

    #[tokio::test]
    async fn test_supply_failure_keeps_transfers() {
        let explorer = MockExplorer::new().with_page(Chain::Bsc, 1, Ok(vec![fresh("0xb", 9_000_000)]));
        let poller = poller(MockAggregator::new(), explorer);

        let result = poller.poll(USDC).await;

        assert!(result.supply.failed);
        assert_eq!(
            result.failures().cloned().collect::<Vec<_>>(),
            vec![FetchError::NoMatch { lookup_key: "USD Coin".into() }]
        );
        assert_eq!(result.large_txs_on(Chain::Bsc).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supply_and_chains_are_fetched_concurrently() {
        let aggregator = MockAggregator::new()
            .with_listing(tether_listing())
            .with_delay(Duration::from_secs(10));
        let explorer = MockExplorer::new()
            .with_delay(Chain::Ethereum, Duration::from_secs(10))
            .with_delay(Chain::Bsc, Duration::from_secs(10));
        let poller = poller(aggregator, explorer);

        let start = tokio::time::Instant::now();
        let result = poller.poll(USDT).await;

        assert!(start.elapsed() >= Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(20));
        assert!(!result.supply.failed);
        assert!(result.is_clean());
    }

    #[tokio::test]
    async fn test_every_chain_present_in_result() {
        let poller = poller(MockAggregator::new().with_listing(tether_listing()), MockExplorer::new());

        let result = poller.poll(USDT).await;

        for chain in Chain::ALL {
            assert!(result.large_txs.contains_key(&chain));
            assert!(result.large_txs_on(chain).is_empty());
            assert!(!result.chain_failed(chain));
        }
    }

    #[tokio::test]
    async fn test_missing_deployment_is_reported() {
        const ETH_ONLY: TokenSpec = TokenSpec {
            symbol: "ETHO",
            aggregator_lookup_key: "Tether",
            contracts: &[(Chain::Ethereum, "0x0000000000000000000000000000000000000001")],
        };
        let explorer = MockExplorer::new();
        let poller = poller(MockAggregator::new().with_listing(tether_listing()), explorer.clone());

        let result = poller.poll(ETH_ONLY).await;

        assert!(result.chain_failed(Chain::Bsc));
        assert!(explorer.get_calls().iter().all(|r| r.chain == Chain::Ethereum));
    }
}
