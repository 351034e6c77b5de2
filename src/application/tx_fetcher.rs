//! Transaction Fetcher
//!
//! Reads at most `max_pages` pages of a contract's transfer history, newest
//! first, one page at a time. Each page waits on the chain's rate limiter.
//! The first empty or failed page ends pagination for that call.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{Chain, FetchError, RawTransaction};
use crate::ports::{ExplorerPort, PageRequest};
use super::rate_limiter::{Provider, ProviderLimiters};

/// Default number of transfers per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default pages read per (chain, token) call
pub const DEFAULT_MAX_PAGES: u32 = 2;

/// Pagination bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Bounded cursor over 1-based page numbers. A fresh cursor per call.
#[derive(Debug, Clone)]
pub struct PageCursor {
    next: u32,
    last: u32,
}

impl PageCursor {
    pub fn new(max_pages: u32) -> Self {
        Self { next: 1, last: max_pages }
    }
}

impl Iterator for PageCursor {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next > self.last {
            return None;
        }
        let page = self.next;
        self.next += 1;
        Some(page)
    }
}

/// What one fetch call produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainFetch {
    /// Transfers in provider order, deduplicated, inside the window
    pub transactions: Vec<RawTransaction>,
    /// Page errors, at most one since the first error stops pagination
    pub errors: Vec<FetchError>,
    pub pages_requested: u32,
}

impl ChainFetch {
    /// An explorer reporting an empty window does not count
    pub fn failed(&self) -> bool {
        self.errors.iter().any(FetchError::is_failure)
    }
}

pub struct TransactionFetcher<E: ExplorerPort> {
    explorer: Arc<E>,
    limiters: ProviderLimiters,
    pagination: PaginationPolicy,
}

impl<E: ExplorerPort> TransactionFetcher<E> {
    pub fn new(explorer: Arc<E>, limiters: ProviderLimiters, pagination: PaginationPolicy) -> Self {
        Self {
            explorer,
            limiters,
            pagination,
        }
    }

    /// Fetch transfers of `contract` on `chain` no older than `since` (unix seconds)
    pub async fn fetch(&self, chain: Chain, contract: &str, since: u64) -> ChainFetch {
        let mut outcome = ChainFetch::default();
        let mut seen: HashSet<(String, String, String, String)> = HashSet::new();

        for page in PageCursor::new(self.pagination.max_pages) {
            let request = PageRequest {
                chain,
                contract_address: contract.to_string(),
                start_time: since,
                page,
                page_size: self.pagination.page_size,
            };

            self.limiters.acquire(Provider::Explorer(chain)).await;
            outcome.pages_requested += 1;

            let batch = match self.explorer.token_transfers(&request).await {
                Ok(batch) => batch,
                Err(e) => {
                    if e.is_no_records() {
                        tracing::debug!("{} page {} for {}: no transfers in window", chain, page, contract);
                    } else if e.is_provider() {
                        tracing::info!("{} page {} for {}: {}", chain, page, contract, e);
                    } else {
                        tracing::warn!("{} page {} for {}: {}", chain, page, contract, e);
                    }
                    outcome.errors.push(e);
                    break;
                }
            };

            if batch.is_empty() {
                tracing::debug!("{} page {} for {} is empty", chain, page, contract);
                break;
            }

            tracing::debug!("{} page {} for {}: {} transfers", chain, page, contract, batch.len());

            for tx in batch {
                if tx.timestamp < since {
                    continue;
                }
                let (hash, from, to, value) = tx.dedup_key();
                let key = (hash.to_string(), from.to_string(), to.to_string(), value.to_string());
                if seen.insert(key) {
                    outcome.transactions.push(tx);
                }
            }
        }

        outcome
    }
}
