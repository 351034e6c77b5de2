//! Large-transaction filter and ranker
//!
//! Pure function over already-fetched transfers: normalize, keep values
//! strictly above the threshold, sort descending (stable), cap.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::transaction::{NormalizedTransaction, RawTransaction};

/// Default threshold in whole tokens
pub const DEFAULT_THRESHOLD: Decimal = dec!(1000000);

/// Default number of transfers kept per chain
pub const DEFAULT_TOP_N: usize = 10;

/// Threshold and cap applied to each chain's transfers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankPolicy {
    pub threshold: Decimal,
    pub top_n: usize,
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Transfers above the threshold, largest first, at most `top_n` long
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LargeTransactionSet(Vec<NormalizedTransaction>);

impl LargeTransactionSet {
    pub const EMPTY: Self = LargeTransactionSet(Vec::new());

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedTransaction> {
        self.0.iter()
    }

    pub fn values(&self) -> Vec<Decimal> {
        self.0.iter().map(|tx| tx.value).collect()
    }
}

impl<'a> IntoIterator for &'a LargeTransactionSet {
    type Item = &'a NormalizedTransaction;
    type IntoIter = std::slice::Iter<'a, NormalizedTransaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Select and rank the large transfers in `transactions`.
///
/// Malformed records are skipped. Ties keep fetch order.
pub fn rank_large_transactions(
    transactions: &[RawTransaction],
    policy: &RankPolicy,
) -> LargeTransactionSet {
    let mut large: Vec<NormalizedTransaction> = transactions
        .iter()
        .filter_map(|raw| match NormalizedTransaction::from_raw(raw.clone()) {
            Ok(tx) => Some(tx),
            Err(e) => {
                tracing::debug!("Skipping transfer {}: {}", raw.hash, e);
                None
            }
        })
        .filter(|tx| tx.value > policy.threshold)
        .collect();

    large.sort_by(|a, b| b.value.cmp(&a.value));
    large.truncate(policy.top_n);

    LargeTransactionSet(large)
}
