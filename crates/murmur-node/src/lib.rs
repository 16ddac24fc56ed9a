//! Murmur Node - a broadcast node speaking JSON lines on stdin/stdout.
//!
//! Wraps the [`murmur_gossip`] core in the transport a cluster test harness
//! expects: one JSON message per line in, one per line out, logs on stderr.
//!
//! # Architecture
//!
//! - **Protocol**: message envelope and typed payloads
//! - **Outbox**: single writer task, `msg_id` allocation, [`murmur_gossip::Transport`] impl
//! - **Node**: per-message dispatch onto the gossip [`Broadcaster`](murmur_gossip::Broadcaster)
//! - **Runtime**: `init` handshake, task-per-message loop, retry scheduler lifecycle
//! - **Config**: retry timing from `MURMUR_*` environment variables
//!
//! # Example
//!
//! ```no_run
//! use murmur_node::{run, NodeConfig};
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     run(config, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod node;
pub mod outbox;
pub mod protocol;
pub mod runtime;
pub mod uid;

pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::BroadcastNode;
pub use outbox::Outbox;
pub use protocol::{Body, Message, Payload};
pub use runtime::run;
