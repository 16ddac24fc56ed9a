//! Error types for the node runtime.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can stop the node.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error on stdin/stdout
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid environment configuration
    #[error("Invalid configuration {name}={value:?}: {reason}")]
    Config {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Gossip setup error
    #[error("Gossip error: {0}")]
    Gossip(#[from] murmur_gossip::Error),

    /// Input ended before the node was initialised
    #[error("input closed before init")]
    NotInitialized,
}
