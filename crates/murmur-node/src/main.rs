//! Murmur Node binary
//!
//! A broadcast node for a cluster test harness. Protocol on stdin/stdout,
//! logs on stderr.

use murmur_node::{run, NodeConfig};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Stdout carries the protocol, so logs must go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_node=info,murmur_gossip=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = NodeConfig::from_env()?;
    tracing::info!(retry = ?config.retry, "Starting Murmur node");

    run(config, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    Ok(())
}
