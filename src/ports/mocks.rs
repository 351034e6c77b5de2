//! Recording mocks for the provider and report ports
//!
//! Scriptable stand-ins used by unit and integration tests. Each mock
//! records the calls it receives and can be told to respond slowly.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;

use crate::domain::{Chain, FetchError, Origin, RawTransaction, TickReport};
use super::explorer::{ExplorerPort, PageRequest};
use super::report::ReportSink;
use super::supply::{PeggedAsset, SupplyPort};

type PageResponse = Result<Vec<RawTransaction>, FetchError>;
type ListingResponse = Result<Vec<PeggedAsset>, FetchError>;

/// Mock aggregator that replays scripted listings in call order
#[derive(Debug, Clone)]
pub struct MockAggregator {
    calls: Arc<Mutex<u32>>,
    scripted: Arc<Mutex<VecDeque<ListingResponse>>>,
    fallback: Arc<Mutex<ListingResponse>>,
    delay: Option<Duration>,
}

impl Default for MockAggregator {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            scripted: Arc::default(),
            fallback: Arc::new(Mutex::new(Ok(Vec::new()))),
            delay: None,
        }
    }
}

impl MockAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: listing returned once scripted responses run out
    pub fn with_listing(self, assets: Vec<PeggedAsset>) -> Self {
        *self.fallback.lock().unwrap() = Ok(assets);
        self
    }

    /// Builder method: queue a response for the next unscripted call
    pub fn then_respond(self, response: ListingResponse) -> Self {
        self.scripted.lock().unwrap().push_back(response);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SupplyPort for MockAggregator {
    async fn pegged_assets(&self) -> Result<Vec<PeggedAsset>, FetchError> {
        let response = {
            *self.calls.lock().unwrap() += 1;
            let next = self.scripted.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

/// Mock explorer keyed by (contract, page) with per-chain fallbacks.
/// Unscripted pages answer the way a quiet explorer window does.
#[derive(Debug, Clone, Default)]
pub struct MockExplorer {
    calls: Arc<Mutex<Vec<PageRequest>>>,
    by_contract: Arc<Mutex<HashMap<(String, u32), PageResponse>>>,
    by_chain: Arc<Mutex<HashMap<(Chain, u32), PageResponse>>>,
    delays: Arc<Mutex<HashMap<Chain, Duration>>>,
}

impl MockExplorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: response for `page` on any contract of `chain`
    pub fn with_page(self, chain: Chain, page: u32, response: PageResponse) -> Self {
        self.by_chain.lock().unwrap().insert((chain, page), response);
        self
    }

    /// Builder method: response for `page` of one specific contract
    pub fn with_contract_page(self, contract: &str, page: u32, response: PageResponse) -> Self {
        self.by_contract
            .lock()
            .unwrap()
            .insert((contract.to_string(), page), response);
        self
    }

    /// Builder method: every request on `chain` takes `delay`
    pub fn with_delay(self, chain: Chain, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(chain, delay);
        self
    }

    pub fn get_calls(&self) -> Vec<PageRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, chain: Chain, contract: &str) -> Vec<u32> {
        self.get_calls()
            .into_iter()
            .filter(|r| r.chain == chain && r.contract_address == contract)
            .map(|r| r.page)
            .collect()
    }
}

#[async_trait]
impl ExplorerPort for MockExplorer {
    async fn token_transfers(&self, request: &PageRequest) -> Result<Vec<RawTransaction>, FetchError> {
        self.calls.lock().unwrap().push(request.clone());

        let delay = self.delays.lock().unwrap().get(&request.chain).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let contract_key = (request.contract_address.clone(), request.page);
        if let Some(response) = self.by_contract.lock().unwrap().get(&contract_key) {
            return response.clone();
        }
        self.by_chain
            .lock()
            .unwrap()
            .get(&(request.chain, request.page))
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::no_records(Origin::Explorer {
                    chain: request.chain,
                    page: request.page,
                }))
            })
    }
}

/// Sink that keeps every published report
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    reports: Arc<Mutex<Vec<TickReport>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<TickReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl ReportSink for RecordingSink {
    fn publish(&self, report: &TickReport) -> std::io::Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(chain: Chain, contract: &str, page: u32) -> PageRequest {
        PageRequest {
            chain,
            contract_address: contract.to_string(),
            start_time: 0,
            page,
            page_size: 20,
        }
    }

    #[tokio::test]
    async fn test_mock_aggregator_replays_script_then_fallback() {
        let mock = MockAggregator::new()
            .then_respond(Err(FetchError::network(Origin::Aggregator, "down")))
            .with_listing(vec![]);

        assert!(mock.pegged_assets().await.is_err());
        assert!(mock.pegged_assets().await.is_ok());
        assert!(mock.pegged_assets().await.is_ok());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_explorer_contract_overrides_chain() {
        let err = FetchError::provider(Origin::Explorer { chain: Chain::Bsc, page: 1 }, "NOTOK");
        let mock = MockExplorer::new()
            .with_page(Chain::Bsc, 1, Ok(vec![]))
            .with_contract_page("0xabc", 1, Err(err.clone()));

        assert_eq!(mock.token_transfers(&request(Chain::Bsc, "0xabc", 1)).await, Err(err));
        assert_eq!(mock.token_transfers(&request(Chain::Bsc, "0xdef", 1)).await, Ok(vec![]));
        assert_eq!(mock.calls_for(Chain::Bsc, "0xabc"), vec![1]);

        let unscripted = mock.token_transfers(&request(Chain::Bsc, "0xdef", 2)).await.unwrap_err();
        assert!(unscripted.is_no_records());
    }
}
