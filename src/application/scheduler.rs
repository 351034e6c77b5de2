//! Poll Scheduler
//!
//! Fans out one Token Poller task per tracked token every tick, waits for
//! all of them or the tick deadline, then publishes the tick's report.
//! A new tick never starts before the previous one was reported.

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::{PollResult, TickReport, TokenSpec, SUPPORTED_TOKENS};
use crate::ports::{ExplorerPort, ReportSink, SupplyPort};
use super::token_poller::TokenPoller;

/// Default tick period
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Default per-tick wait for pollers
pub const DEFAULT_TICK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// Tick period and per-tick deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    pub tick_timeout: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            tick_timeout: DEFAULT_TICK_TIMEOUT,
        }
    }
}

impl Schedule {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.interval.is_zero() {
            return Err(SchedulerError::InvalidSchedule("interval must be > 0".into()));
        }
        if self.tick_timeout.is_zero() || self.tick_timeout >= self.interval {
            return Err(SchedulerError::InvalidSchedule(format!(
                "tick_timeout must be > 0 and < interval ({:?}), got {:?}",
                self.interval, self.tick_timeout
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
    Stopped,
}

/// Status snapshot of the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub ticks_completed: u64,
    pub last_tick_errors: Option<usize>,
}

/// Resolves once a stop was requested
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Spawned poller tasks for one tick, aborted if the tick is dropped
struct PollTasks(Vec<(TokenSpec, JoinHandle<PollResult>)>);

impl Drop for PollTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}

pub struct Scheduler<S: SupplyPort, E: ExplorerPort> {
    poller: Arc<TokenPoller<S, E>>,
    tokens: &'static [TokenSpec],
    schedule: Schedule,
    status: Arc<RwLock<SchedulerStatus>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl<S: SupplyPort + 'static, E: ExplorerPort + 'static> Scheduler<S, E> {
    pub fn new(poller: TokenPoller<S, E>, schedule: Schedule) -> Result<Self, SchedulerError> {
        schedule.validate()?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            poller: Arc::new(poller),
            tokens: SUPPORTED_TOKENS,
            schedule,
            status: Arc::new(RwLock::new(SchedulerStatus {
                state: SchedulerState::Idle,
                ticks_completed: 0,
                last_tick_errors: None,
            })),
            shutdown: Arc::new(shutdown),
        })
    }

    /// Poll a different token set
    pub fn with_tokens(mut self, tokens: &'static [TokenSpec]) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Tick immediately, then every interval, until `stop` is called
    pub async fn run<R: ReportSink + ?Sized>(&self, sink: &R) -> Result<(), SchedulerError> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            self.set_state(SchedulerState::Stopped).await;
            return Ok(());
        }

        tracing::info!(
            "Starting scheduler - {} tokens, interval {:?}, tick timeout {:?}",
            self.tokens.len(),
            self.schedule.interval,
            self.schedule.tick_timeout
        );

        let mut ticker = tokio::time::interval(self.schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            let report = tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => {
                    tracing::warn!("Shutdown during tick, abandoning in-flight polls");
                    break;
                }
                report = self.tick() => report,
            };

            if let Err(e) = sink.publish(&report) {
                tracing::error!("Failed to publish tick {} report: {}", report.tick, e);
            }
        }

        self.set_state(SchedulerState::Stopped).await;
        tracing::info!("Scheduler stopped");
        Ok(())
    }

    /// Run exactly one tick and return its report
    pub async fn run_once(&self) -> TickReport {
        self.tick().await
    }

    async fn tick(&self) -> TickReport {
        let tick = {
            let mut status = self.status.write().await;
            status.state = SchedulerState::Polling;
            status.ticks_completed + 1
        };
        let started_at = Utc::now();
        tracing::info!("Tick {} - polling {} tokens", tick, self.tokens.len());

        let results = self.poll_all().await;

        let report = TickReport {
            tick,
            started_at,
            finished_at: Utc::now(),
            results,
        };

        let errors = report.error_count();
        {
            let mut status = self.status.write().await;
            status.state = SchedulerState::Idle;
            status.ticks_completed = tick;
            status.last_tick_errors = Some(errors);
        }
        if errors > 0 {
            tracing::warn!("Tick {} finished with {} fetch errors", tick, errors);
        } else {
            tracing::info!("Tick {} finished cleanly", tick);
        }

        report
    }

    /// One task per token, joined in token order under a shared deadline
    async fn poll_all(&self) -> Vec<PollResult> {
        let deadline = Instant::now() + self.schedule.tick_timeout;

        let mut tasks = PollTasks(Vec::with_capacity(self.tokens.len()));
        for token in self.tokens.iter().copied() {
            let poller = Arc::clone(&self.poller);
            tasks.0.push((token, tokio::spawn(async move { poller.poll(token).await })));
        }

        let mut results = Vec::with_capacity(tasks.0.len());
        for (token, handle) in tasks.0.iter_mut() {
            let result = match tokio::time::timeout_at(deadline, &mut *handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    tracing::error!("{} poller crashed: {}", token.symbol, e);
                    PollResult::abandoned(*token, format!("poller task failed: {}", e))
                }
                Err(_) => {
                    handle.abort();
                    tracing::error!(
                        "{} poller gave no result within {:?}",
                        token.symbol,
                        self.schedule.tick_timeout
                    );
                    PollResult::abandoned(
                        *token,
                        format!("no result within {:?}", self.schedule.tick_timeout),
                    )
                }
            };
            results.push(result);
        }

        results
    }

    /// Stop the scheduler loop. Idempotent.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
        tracing::info!("Stop signal sent to scheduler");
    }

    /// Get current status snapshot
    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    async fn set_state(&self, state: SchedulerState) {
        self.status.write().await.state = state;
    }
}

// Shares the poller, status, and stop signal (needed for the signal task)
impl<S: SupplyPort, E: ExplorerPort> Clone for Scheduler<S, E> {
    fn clone(&self) -> Self {
        Self {
            poller: Arc::clone(&self.poller),
            tokens: self.tokens,
            schedule: self.schedule,
            status: Arc::clone(&self.status),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::rate_limiter::ProviderLimiters;
    use crate::application::token_poller::PollSettings;
    use crate::domain::{Chain, FetchError, Origin, USDC, USDT};
    use crate::ports::mocks::{MockAggregator, MockExplorer, RecordingSink};
    use crate::ports::PeggedAsset;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    const TWO_TOKENS: &[TokenSpec] = &[USDT, USDC];

    fn listing() -> Vec<PeggedAsset> {
        vec![
            PeggedAsset { name: "Tether".into(), symbol: "USDT".into(), circulating_usd: Some(dec!(100)) },
            PeggedAsset { name: "USD Coin".into(), symbol: "USDC".into(), circulating_usd: Some(dec!(50)) },
        ]
    }

    fn scheduler(
        aggregator: MockAggregator,
        explorer: MockExplorer,
        schedule: Schedule,
    ) -> Scheduler<MockAggregator, MockExplorer> {
        let poller = TokenPoller::new(
            Arc::new(aggregator),
            Arc::new(explorer),
            ProviderLimiters::default(),
            PollSettings::default(),
        );
        Scheduler::new(poller, schedule).unwrap().with_tokens(TWO_TOKENS)
    }

    #[test]
    fn test_schedule_validation() {
        assert!(Schedule::default().validate().is_ok());

        let bad = Schedule { interval: Duration::from_secs(60), tick_timeout: Duration::from_secs(60) };
        assert!(bad.validate().is_err());

        let bad = Schedule { interval: Duration::ZERO, tick_timeout: Duration::ZERO };
        assert!(bad.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_aggregator_failure_still_yields_every_result() {
        let aggregator = MockAggregator::new()
            .then_respond(Err(FetchError::network(Origin::Aggregator, "connection reset")))
            .with_listing(listing());
        let scheduler = scheduler(aggregator, MockExplorer::new(), Schedule::default());

        let report = scheduler.run_once().await;

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].token, USDT);
        assert_eq!(report.results[1].token, USDC);
        let failed = report.results.iter().filter(|r| r.supply.failed).count();
        assert_eq!(failed, 1);
        assert_eq!(report.error_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_poller_is_abandoned_at_deadline() {
        let explorer = MockExplorer::new().with_delay(Chain::Bsc, Duration::from_secs(3600));
        let schedule = Schedule { interval: Duration::from_secs(900), tick_timeout: Duration::from_secs(30) };
        let scheduler = scheduler(MockAggregator::new().with_listing(listing()), explorer, schedule);

        let start = Instant::now();
        let report = scheduler.run_once().await;

        assert!(start.elapsed() >= Duration::from_secs(30));
        assert!(start.elapsed() < Duration::from_secs(31));
        assert_eq!(report.results.len(), 2);
        for result in &report.results {
            assert!(matches!(result.errors.as_slice(), [FetchError::Abandoned { .. }]));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_are_polled_concurrently() {
        let explorer = MockExplorer::new()
            .with_delay(Chain::Ethereum, Duration::from_secs(10))
            .with_delay(Chain::Bsc, Duration::from_secs(10));
        let schedule = Schedule { interval: Duration::from_secs(900), tick_timeout: Duration::from_secs(60) };
        let poller = TokenPoller::new(
            Arc::new(MockAggregator::new().with_listing(listing())),
            Arc::new(explorer),
            ProviderLimiters::default(),
            PollSettings::default(),
        );
        let scheduler = Scheduler::new(poller, schedule).unwrap();

        let start = Instant::now();
        let report = scheduler.run_once().await;

        assert_eq!(report.results.len(), SUPPORTED_TOKENS.len());
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(20));
        assert!(report
            .results
            .iter()
            .all(|r| r.failures().all(|e| !matches!(e, FetchError::Abandoned { .. }))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_immediately_then_every_interval() {
        let schedule = Schedule { interval: Duration::from_secs(900), tick_timeout: Duration::from_secs(60) };
        let scheduler = scheduler(MockAggregator::new().with_listing(listing()), MockExplorer::new(), schedule);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let runner = scheduler.clone();
        let start = Instant::now();
        let handle = tokio::spawn(async move { runner.run(&tx).await });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.tick, 1);
        assert!(start.elapsed() < Duration::from_secs(1));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.tick, 2);
        assert!(start.elapsed() >= Duration::from_secs(900));

        scheduler.stop();
        handle.await.unwrap().unwrap();
        let status = scheduler.status().await;
        assert_eq!(status.state, SchedulerState::Stopped);
        assert_eq!(status.ticks_completed, 2);
        assert_eq!(status.last_tick_errors, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_run_publishes_nothing() {
        let scheduler = scheduler(MockAggregator::new(), MockExplorer::new(), Schedule::default());
        let sink = RecordingSink::new();

        scheduler.stop();
        scheduler.stop();
        scheduler.run(&sink).await.unwrap();

        assert!(sink.reports().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_tick_reports_no_partial_tick() {
        let explorer = MockExplorer::new().with_delay(Chain::Ethereum, Duration::from_secs(3600));
        let schedule = Schedule { interval: Duration::from_secs(3 * 3600), tick_timeout: Duration::from_secs(2 * 3600) };
        let scheduler = scheduler(MockAggregator::new().with_listing(listing()), explorer, schedule);
        let sink = RecordingSink::new();

        let runner = scheduler.clone();
        let run_sink = sink.clone();
        let handle = tokio::spawn(async move { runner.run(&run_sink).await });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(scheduler.status().await.state, SchedulerState::Polling);
        scheduler.stop();
        handle.await.unwrap().unwrap();

        assert!(sink.reports().is_empty());
    }
}
