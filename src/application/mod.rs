//! Application Layer - Polling pipeline
//!
//! Rate limiting, supply and transfer fetching, per-token polling, and the
//! tick scheduler that drives them.

pub mod rate_limiter;
pub mod supply_fetcher;
pub mod tx_fetcher;
pub mod token_poller;
pub mod scheduler;

pub use rate_limiter::{Provider, ProviderLimiters, RateLimit, RateLimiter};
pub use supply_fetcher::{SupplyFetcher, SupplyOutcome};
pub use tx_fetcher::{ChainFetch, PageCursor, PaginationPolicy, TransactionFetcher};
pub use token_poller::{PollSettings, TokenPoller};
pub use scheduler::{Schedule, Scheduler, SchedulerError, SchedulerState, SchedulerStatus};
