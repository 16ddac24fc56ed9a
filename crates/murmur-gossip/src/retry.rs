//! Retry Scheduler - periodic resend of unacknowledged gossip.
//!
//! Message loss is only ever repaired here. Each firing pulls the due
//! records out of the tracker under the engine lock, releases it and resends
//! them. Records are not re-tracked; they stay pending until acked, so a
//! neighbor that never answers is retried for the life of the process.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::{Broadcaster, Transport};

/// Retry timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// How often the scheduler fires.
    pub interval: Duration,

    /// Minimum time since the last send before a record is resent.
    pub grace: Duration,

    /// Upper bound on resends per firing. `None` resends everything due.
    pub batch_limit: Option<usize>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            grace: Duration::from_millis(400),
            batch_limit: None,
        }
    }
}

impl RetryConfig {
    /// Fast retries for tests and local clusters.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            interval: Duration::from_millis(10),
            grace: Duration::from_millis(20),
            batch_limit: None,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    #[must_use]
    pub fn with_batch_limit(mut self, limit: Option<usize>) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Reject settings that would stall retries.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::ZeroRetryInterval(self.interval));
        }
        if self.batch_limit == Some(0) {
            return Err(Error::ZeroBatchLimit);
        }
        Ok(())
    }
}

/// Background task resending pending gossip on a fixed interval.
pub struct RetryScheduler<T: Transport> {
    broadcaster: Broadcaster<T>,
    config: RetryConfig,
}

impl<T: Transport> RetryScheduler<T> {
    pub fn new(broadcaster: Broadcaster<T>, config: RetryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            broadcaster,
            config,
        })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run one firing. Returns the number of messages resent.
    pub async fn tick(&self) -> usize {
        let sent = self
            .broadcaster
            .retry(self.config.grace, self.config.batch_limit)
            .await;
        if sent > 0 {
            let stats = self.broadcaster.stats().await;
            debug!(
                resent = sent,
                pending = stats.pending,
                total_retries = stats.retries,
                "Retry firing"
            );
        }
        sent
    }

    /// Fire forever.
    pub async fn run(self) {
        info!(
            interval = ?self.config.interval,
            grace = ?self.config.grace,
            batch_limit = ?self.config.batch_limit,
            "Retry scheduler started"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Run on the current tokio runtime. Abort the handle to stop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
