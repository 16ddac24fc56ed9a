//! Error types for murmur-gossip.
//!
//! Protocol operations themselves are total and never fail; errors only
//! arise when configuring the background machinery.

use std::time::Duration;

use thiserror::Error;

/// Result type for murmur-gossip operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up gossip components.
#[derive(Debug, Error)]
pub enum Error {
    /// The retry interval must be non-zero.
    #[error("retry interval must be greater than zero, got {0:?}")]
    ZeroRetryInterval(Duration),

    /// A batch limit of zero would never resend anything.
    #[error("retry batch limit must be greater than zero when set")]
    ZeroBatchLimit,
}
