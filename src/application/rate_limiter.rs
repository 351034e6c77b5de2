//! Per-provider rate limiting
//!
//! GCRA limiter (governor) per provider. A ceiling of `n` requests per
//! window becomes one cell every `window / n` with no burst, so no sliding
//! window ever holds more than `n` requests. `acquire` never rejects; it only
//! delays. Waiters queue on a fair async mutex, so they are released in
//! arrival order.

use governor::{
    clock::Clock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::Chain;

/// Ceiling for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests allowed per window; `None` means no count ceiling
    pub max_requests: Option<u32>,
    pub window: Duration,
    /// Minimum spacing between consecutive requests
    pub min_interval: Duration,
}

impl RateLimit {
    pub fn per_second(max_requests: u32) -> Self {
        Self {
            max_requests: Some(max_requests),
            window: Duration::from_secs(1),
            min_interval: Duration::ZERO,
        }
    }

    /// No count ceiling, only spacing between calls
    pub fn polite(min_interval: Duration) -> Self {
        Self {
            max_requests: None,
            window: Duration::from_secs(1),
            min_interval,
        }
    }

    /// Spacing between consecutive cells
    pub fn spacing(&self) -> Duration {
        match self.max_requests {
            Some(max) if max > 0 => (self.window / max).max(self.min_interval),
            _ => self.min_interval,
        }
    }

    fn quota(&self) -> Option<Quota> {
        Quota::with_period(self.spacing())
    }
}

/// Data provider a limiter guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Aggregator,
    Explorer(Chain),
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Aggregator => write!(f, "aggregator"),
            Provider::Explorer(chain) => write!(f, "{} explorer", chain),
        }
    }
}

/// Governor clock reading tokio's clock, so paused test time drives the limiter
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        Instant::now().into_std()
    }
}

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<std::time::Instant>>;

/// Async rate limiter for a single provider
pub struct RateLimiter {
    provider: Provider,
    limit: RateLimit,
    /// `None` when the limit has neither a ceiling nor a spacing
    cells: Option<DirectLimiter>,
    /// Fair queue of waiters; only the head polls the limiter
    queue: Mutex<()>,
    clock: TokioClock,
}

impl RateLimiter {
    pub fn new(provider: Provider, limit: RateLimit) -> Self {
        let clock = TokioClock;
        let cells = limit
            .quota()
            .map(|quota| GovernorLimiter::direct_with_clock(quota, &clock));

        Self {
            provider,
            limit,
            cells,
            queue: Mutex::new(()),
            clock,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Wait until a request may be issued
    pub async fn acquire(&self) {
        let Some(cells) = &self.cells else {
            return;
        };

        let _turn = self.queue.lock().await;
        while let Err(not_until) = cells.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            tracing::trace!("{} rate limit: waiting {:?}", self.provider, wait);
            tokio::time::sleep(wait).await;
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("provider", &self.provider)
            .field("limit", &self.limit)
            .finish()
    }
}

/// One independent limiter per provider, shared across pollers
#[derive(Debug, Clone)]
pub struct ProviderLimiters {
    aggregator: Arc<RateLimiter>,
    ethereum: Arc<RateLimiter>,
    bsc: Arc<RateLimiter>,
}

impl ProviderLimiters {
    pub fn new(aggregator: RateLimit, ethereum: RateLimit, bsc: RateLimit) -> Self {
        Self {
            aggregator: Arc::new(RateLimiter::new(Provider::Aggregator, aggregator)),
            ethereum: Arc::new(RateLimiter::new(Provider::Explorer(Chain::Ethereum), ethereum)),
            bsc: Arc::new(RateLimiter::new(Provider::Explorer(Chain::Bsc), bsc)),
        }
    }

    pub fn get(&self, provider: Provider) -> &RateLimiter {
        match provider {
            Provider::Aggregator => &self.aggregator,
            Provider::Explorer(Chain::Ethereum) => &self.ethereum,
            Provider::Explorer(Chain::Bsc) => &self.bsc,
        }
    }

    pub async fn acquire(&self, provider: Provider) {
        self.get(provider).acquire().await
    }
}

impl Default for ProviderLimiters {
    /// Published explorer ceilings (5/s) and a polite aggregator
    fn default() -> Self {
        Self::new(
            RateLimit::polite(Duration::from_millis(250)),
            RateLimit::per_second(5),
            RateLimit::per_second(5),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate_then_spaced() {
        let limiter = RateLimiter::new(Provider::Explorer(Chain::Ethereum), RateLimit::per_second(5));
        let start = Instant::now();

        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(start.elapsed() < Duration::from_millis(210));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_request_waits_for_window() {
        let limiter = RateLimiter::new(Provider::Explorer(Chain::Ethereum), RateLimit::per_second(5));
        let start = Instant::now();

        for _ in 0..6 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_ceiling_in_any_window() {
        let limiter = Arc::new(RateLimiter::new(Provider::Explorer(Chain::Bsc), RateLimit::per_second(5)));
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..17 {
            let limiter = Arc::clone(&limiter);
            let stamps = Arc::clone(&stamps);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                stamps.lock().await.push(Instant::now());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut stamps = stamps.lock().await.clone();
        stamps.sort();
        assert_eq!(stamps.len(), 17);
        for (i, t) in stamps.iter().enumerate() {
            let in_window = stamps[i..]
                .iter()
                .take_while(|s| s.duration_since(*t) < Duration::from_secs(1))
                .count();
            assert!(in_window <= 5, "{} requests inside one second", in_window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polite_spacing() {
        let limiter = RateLimiter::new(Provider::Aggregator, RateLimit::polite(Duration::from_millis(250)));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(start.elapsed() < Duration::from_millis(520));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::new(Provider::Aggregator, RateLimit::polite(Duration::ZERO));
        let start = Instant::now();

        for _ in 0..50 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_spacing_from_ceiling() {
        assert_eq!(RateLimit::per_second(5).spacing(), Duration::from_millis(200));
        assert_eq!(RateLimit::polite(Duration::from_millis(250)).spacing(), Duration::from_millis(250));

        let both = RateLimit {
            max_requests: Some(10),
            window: Duration::from_secs(1),
            min_interval: Duration::from_millis(300),
        };
        assert_eq!(both.spacing(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_providers_are_isolated() {
        let limiters = ProviderLimiters::default();

        // Saturate Ethereum, then queue more behind it
        for _ in 0..5 {
            limiters.acquire(Provider::Explorer(Chain::Ethereum)).await;
        }
        let eth = limiters.clone();
        let backlog = tokio::spawn(async move {
            for _ in 0..5 {
                eth.acquire(Provider::Explorer(Chain::Ethereum)).await;
            }
        });
        tokio::task::yield_now().await;

        let start = Instant::now();
        limiters.acquire(Provider::Explorer(Chain::Bsc)).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        backlog.await.unwrap();
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(Provider::Explorer(Chain::Bsc).to_string(), "BSC explorer");
        assert_eq!(Provider::Aggregator.to_string(), "aggregator");
    }
}
