//! The acquisition-and-publish loop: strictly sequential
//! fetch → parse → publish cycles with a shared failure streak and two-tier
//! backoff (normal interval on success, shorter fixed delay on failure, hard
//! cap on consecutive failures).

use crate::config::PollConfig;
use crate::discovery::{DiscoveryPublisher, MessageBus};
use crate::error::AppError;
use crate::extract::{self, MetricReading};
use crate::fetch::StatusFetcher;
use crate::registry::SensorRegistry;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Default)]
pub struct ErrorStreak {
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

/// Outcome of a single cycle; created fresh each cycle and discarded after
/// logging. Readings already published before a failure stay published.
#[derive(Debug, Default)]
pub struct PollCycleResult {
    pub readings: Vec<MetricReading>,
    pub fetch_succeeded: bool,
    pub parse_succeeded: bool,
    pub publish_succeeded: bool,
    pub error: Option<AppError>,
}

impl PollCycleResult {
    pub fn is_success(&self) -> bool {
        self.fetch_succeeded
            && self.parse_succeeded
            && self.publish_succeeded
            && self.error.is_none()
    }
}

pub struct PollLoop<F, B> {
    fetcher: F,
    registry: SensorRegistry,
    publisher: DiscoveryPublisher<B>,
    interval: Duration,
    retry_delay: Duration,
    max_consecutive_errors: u32,
    streak: ErrorStreak,
}

impl<F: StatusFetcher, B: MessageBus> PollLoop<F, B> {
    pub fn new(
        fetcher: F,
        registry: SensorRegistry,
        publisher: DiscoveryPublisher<B>,
        cfg: &PollConfig,
    ) -> Self {
        Self {
            fetcher,
            registry,
            publisher,
            interval: Duration::from_secs(cfg.interval_secs),
            retry_delay: Duration::from_secs(cfg.error_retry_delay_secs),
            max_consecutive_errors: cfg.max_consecutive_errors,
            streak: ErrorStreak::default(),
        }
    }

    pub fn streak(&self) -> &ErrorStreak {
        &self.streak
    }

    /// Run one fetch → parse → publish cycle.
    pub async fn run_cycle(&mut self) -> PollCycleResult {
        let mut result = PollCycleResult::default();

        let document = match self.fetcher.fetch_status().await {
            Ok(body) => body,
            Err(e) => {
                result.error = Some(e);
                return result;
            }
        };
        result.fetch_succeeded = true;

        let readings = match extract::parse_status(&document) {
            Ok(readings) => readings,
            Err(e) => {
                result.error = Some(e);
                return result;
            }
        };
        result.parse_succeeded = true;

        match self.publish_readings(&readings).await {
            Ok(()) => result.publish_succeeded = true,
            Err(e) => result.error = Some(e),
        }
        result.readings = readings;
        result
    }

    /// Announce-on-first-sight, then state, per reading. An identity is only
    /// marked seen after its announce went through, so a failed announce is
    /// retried next cycle (re-announcing is harmless either way).
    async fn publish_readings(&mut self, readings: &[MetricReading]) -> Result<(), AppError> {
        for reading in readings {
            let sensor = self.registry.resolve(reading);
            if self.registry.is_first_seen(&reading.identity) {
                self.publisher.announce(&sensor).await?;
                self.registry.mark_seen(&reading.identity);
            }
            self.publisher
                .publish_state(&reading.identity, reading.value)
                .await?;
        }
        Ok(())
    }

    /// Account for a finished cycle: returns the delay before the next cycle,
    /// or an error once the failure streak exceeds the configured maximum.
    pub fn observe(&mut self, result: &PollCycleResult) -> Result<Duration, AppError> {
        if result.is_success() {
            if self.streak.consecutive_failures > 0 {
                info!(
                    after_failures = self.streak.consecutive_failures,
                    "recovered from failure streak"
                );
            }
            self.streak = ErrorStreak::default();
            info!(sensors = result.readings.len(), "poll cycle completed");
            return Ok(self.interval);
        }

        let (kind, message) = match &result.error {
            Some(e) => (e.kind(), e.to_string()),
            None => ("other", "cycle failed without a recorded error".to_string()),
        };
        self.streak.consecutive_failures += 1;
        self.streak.last_error = Some(message.clone());
        warn!(
            kind,
            error = %message,
            streak = self.streak.consecutive_failures,
            max = self.max_consecutive_errors,
            "poll cycle failed"
        );

        if self.streak.consecutive_failures > self.max_consecutive_errors {
            error!(
                streak = self.streak.consecutive_failures,
                "maximum consecutive errors exceeded, giving up"
            );
            return Err(AppError::Other(anyhow::anyhow!(
                "aborting after {} consecutive failed cycles (last error: {message})",
                self.streak.consecutive_failures
            )));
        }
        Ok(self.retry_delay)
    }

    /// Drive cycles until cancellation or a fatal failure streak. Ctrl-c is
    /// observed at the sleep boundary, where no cycle state is in flight.
    pub async fn run(mut self) -> Result<(), AppError> {
        let sig = tokio::signal::ctrl_c();
        tokio::pin!(sig);
        loop {
            let result = self.run_cycle().await;
            let delay = self.observe(&result)?;
            tokio::select! {
                biased;
                _ = &mut sig => {
                    info!("shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
