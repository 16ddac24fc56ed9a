//! Node configuration from the environment.

use std::time::Duration;

use murmur_gossip::RetryConfig;

use crate::error::{Error, Result};

pub const ENV_RETRY_INTERVAL_MS: &str = "MURMUR_RETRY_INTERVAL_MS";
pub const ENV_RETRY_GRACE_MS: &str = "MURMUR_RETRY_GRACE_MS";
pub const ENV_RETRY_BATCH: &str = "MURMUR_RETRY_BATCH";

/// Configuration for a broadcast node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeConfig {
    /// Retry scheduler timing
    pub retry: RetryConfig,
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    ///
    /// - `MURMUR_RETRY_INTERVAL_MS`: scheduler period (default 200)
    /// - `MURMUR_RETRY_GRACE_MS`: minimum wait before a resend (default 400)
    /// - `MURMUR_RETRY_BATCH`: max resends per firing, 0 for no limit (default 0)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RetryConfig::default();

        let interval = match lookup(ENV_RETRY_INTERVAL_MS) {
            Some(raw) => Duration::from_millis(parse_u64(ENV_RETRY_INTERVAL_MS, &raw)?),
            None => defaults.interval,
        };
        let grace = match lookup(ENV_RETRY_GRACE_MS) {
            Some(raw) => Duration::from_millis(parse_u64(ENV_RETRY_GRACE_MS, &raw)?),
            None => defaults.grace,
        };
        let batch_limit = match lookup(ENV_RETRY_BATCH) {
            Some(raw) => match parse_u64(ENV_RETRY_BATCH, &raw)? {
                0 => None,
                n => Some(usize::try_from(n).map_err(|e| Error::Config {
                    name: ENV_RETRY_BATCH,
                    value: raw.clone(),
                    reason: e.to_string(),
                })?),
            },
            None => defaults.batch_limit,
        };

        let retry = RetryConfig {
            interval,
            grace,
            batch_limit,
        };
        retry.validate()?;

        Ok(Self { retry })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

fn parse_u64(name: &'static str, raw: &str) -> Result<u64> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| Error::Config {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
