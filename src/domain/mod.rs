//! Domain Layer - Core types and pure logic for the stablecoin tracker
//!
//! No I/O happens here. Provider access goes through the ports layer.
//!
//! - `token`: tracked tokens and chains (static configuration)
//! - `transaction`: raw and normalized transfer records
//! - `ranker`: large-transaction filter and ranking
//! - `poll`: per-tick results and the fetch error taxonomy

pub mod token;
pub mod transaction;
pub mod ranker;
pub mod poll;

pub use token::{Chain, TokenSpec, SUPPORTED_TOKENS, USDT, USDC, BUSD};
pub use transaction::{RawTransaction, NormalizedTransaction, NormalizeError};
pub use ranker::{rank_large_transactions, LargeTransactionSet, RankPolicy, DEFAULT_THRESHOLD, DEFAULT_TOP_N};
pub use poll::{FetchError, Origin, PollResult, SupplyReading, TickReport, NO_RECORDS_MESSAGE};
