//! Per-tick poll results and the fetch error taxonomy

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::ranker::LargeTransactionSet;
use super::token::{Chain, TokenSpec};

/// Where a fetch failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Origin {
    /// Stablecoin aggregator (supply lookup)
    Aggregator,
    /// Chain explorer, for a given page of transfer history
    Explorer { chain: Chain, page: u32 },
    /// The scheduler itself (poller deadline or crash)
    Scheduler,
}

impl Origin {
    pub fn chain(&self) -> Option<Chain> {
        match self {
            Origin::Explorer { chain, .. } => Some(*chain),
            _ => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Aggregator => write!(f, "aggregator"),
            Origin::Explorer { chain, page } => write!(f, "{} explorer page {}", chain, page),
            Origin::Scheduler => write!(f, "scheduler"),
        }
    }
}

/// Explorer message for a window with no matching transfers
pub const NO_RECORDS_MESSAGE: &str = "No transactions found";

/// Non-fatal failure recorded in a `PollResult`
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    /// Timeout or connection failure
    #[error("Network error from {origin}: {message}")]
    Network { origin: Origin, message: String },

    /// Provider answered with a non-success status or message
    #[error("Provider error from {origin}: {message}")]
    Provider { origin: Origin, message: String },

    /// Malformed or missing fields in a response
    #[error("Parse error from {origin}: {message}")]
    Parse { origin: Origin, message: String },

    /// Aggregator has no record for the lookup key
    #[error("No aggregator record matches '{lookup_key}'")]
    NoMatch { lookup_key: String },

    /// Scheduler stopped waiting for this poller
    #[error("Poll abandoned: {reason}")]
    Abandoned { reason: String },
}

impl FetchError {
    pub fn network(origin: Origin, message: impl Into<String>) -> Self {
        FetchError::Network { origin, message: message.into() }
    }

    pub fn provider(origin: Origin, message: impl Into<String>) -> Self {
        FetchError::Provider { origin, message: message.into() }
    }

    pub fn parse(origin: Origin, message: impl Into<String>) -> Self {
        FetchError::Parse { origin, message: message.into() }
    }

    /// Explorer answered that the window holds no transfers
    pub fn no_records(origin: Origin) -> Self {
        FetchError::provider(origin, NO_RECORDS_MESSAGE)
    }

    /// Map a transport or body decode error. Clients check HTTP status first.
    pub fn from_reqwest(origin: Origin, err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::parse(origin, err.to_string())
        } else {
            FetchError::network(origin, err.to_string())
        }
    }

    pub fn origin(&self) -> Origin {
        match self {
            FetchError::Network { origin, .. }
            | FetchError::Provider { origin, .. }
            | FetchError::Parse { origin, .. } => *origin,
            FetchError::NoMatch { .. } => Origin::Aggregator,
            FetchError::Abandoned { .. } => Origin::Scheduler,
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, FetchError::Provider { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }

    /// Provider status for an empty window. Recorded, but no data is missing.
    pub fn is_no_records(&self) -> bool {
        matches!(self, FetchError::Provider { message, .. } if message == NO_RECORDS_MESSAGE)
    }

    /// True when this error means data is missing from the result
    pub fn is_failure(&self) -> bool {
        !self.is_no_records()
    }
}

/// Circulating supply for one token at fetch time.
///
/// A failed lookup reads zero with `failed` set, distinct from a real zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyReading {
    pub token: TokenSpec,
    pub total_supply: Decimal,
    pub as_of: DateTime<Utc>,
    pub failed: bool,
}

impl SupplyReading {
    pub fn ok(token: TokenSpec, total_supply: Decimal) -> Self {
        Self {
            token,
            total_supply,
            as_of: Utc::now(),
            failed: false,
        }
    }

    pub fn failed(token: TokenSpec) -> Self {
        Self {
            token,
            total_supply: Decimal::ZERO,
            as_of: Utc::now(),
            failed: true,
        }
    }
}

/// Everything one tick learned about one token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollResult {
    pub token: TokenSpec,
    pub supply: SupplyReading,
    pub large_txs: BTreeMap<Chain, LargeTransactionSet>,
    pub errors: Vec<FetchError>,
}

impl PollResult {
    /// Result for a poller that never reported back
    pub fn abandoned(token: TokenSpec, reason: impl Into<String>) -> Self {
        Self {
            token,
            supply: SupplyReading::failed(token),
            large_txs: Chain::ALL
                .iter()
                .map(|chain| (*chain, LargeTransactionSet::empty()))
                .collect(),
            errors: vec![FetchError::Abandoned { reason: reason.into() }],
        }
    }

    /// Errors that left data missing
    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.errors.iter().filter(|e| e.is_failure())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Errors raised while fetching this chain's transfers
    pub fn chain_errors(&self, chain: Chain) -> impl Iterator<Item = &FetchError> {
        self.errors
            .iter()
            .filter(move |e| e.origin().chain() == Some(chain))
    }

    /// True when the chain's transfer list cannot be trusted as complete.
    /// An explorer reporting an empty window is not a failure.
    pub fn chain_failed(&self, chain: Chain) -> bool {
        self.chain_errors(chain).any(FetchError::is_failure)
            || self
                .errors
                .iter()
                .any(|e| matches!(e, FetchError::Abandoned { .. }))
    }

    /// Ranked transfers for a chain, empty when the chain was not polled
    pub fn large_txs_on(&self, chain: Chain) -> &LargeTransactionSet {
        static EMPTY: LargeTransactionSet = LargeTransactionSet::EMPTY;
        self.large_txs.get(&chain).unwrap_or(&EMPTY)
    }
}

/// One completed tick, handed to the report sink
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<PollResult>,
}

impl TickReport {
    /// Errors that left data missing, across all tokens
    pub fn error_count(&self) -> usize {
        self.results.iter().map(|r| r.failures().count()).sum()
    }
}
