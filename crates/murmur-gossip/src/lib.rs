//! Murmur Gossip - Reliable Broadcast over a Sparse Topology
//!
//! Every node holds a grow-only set of integer values and is responsible for
//! pushing each value it learns to the neighbors assigned to it by an external
//! topology. The transport underneath is assumed to lose, duplicate and
//! reorder messages, so delivery is made reliable per (value, neighbor) pair:
//!
//! - **Dedup**: a value is only fanned out the first time it is seen
//! - **Sender exclusion**: a value is never sent back to the peer it came from
//! - **Acknowledgment**: every received gossip is acked, acks clear pending records
//! - **Retry**: a background task resends whatever is still pending
//!
//! # Architecture
//!
//! ```text
//!   inbound value ──► GossipEngine ──► ValueStore (novel?)
//!                          │
//!                          ├──► PendingAckTracker.track(v, n)  for each neighbor n
//!                          └──► Vec<Outbound>  (sent after the lock is released)
//!
//!   RetryScheduler ──(interval)──► PendingAckTracker.next_retry_batch(grace)
//! ```
//!
//! [`GossipEngine`] is a plain state machine with no I/O. [`Broadcaster`]
//! wraps it in a single lock together with a [`Transport`] and is what the
//! node runtime and the [`RetryScheduler`] share.
//!
//! # Example
//!
//! ```
//! use murmur_gossip::{Gossip, GossipEngine, NodeId};
//!
//! let mut engine = GossipEngine::new(NodeId::from("n1"));
//! engine.apply_topology(vec![NodeId::from("n2"), NodeId::from("n3")]);
//!
//! let out = engine.accept_external_value(5);
//! assert_eq!(out.len(), 2);
//! assert!(out.iter().all(|o| o.message == Gossip::Value(5)));
//! assert_eq!(engine.pending_count(), 2);
//! ```

mod broadcaster;
mod engine;
pub mod error;
mod neighbors;
mod pending;
mod retry;
mod store;
mod types;

pub use broadcaster::{Broadcaster, Transport};
pub use engine::{EngineStats, GossipEngine};
pub use error::{Error, Result};
pub use neighbors::NeighborTable;
pub use pending::{PendingAck, PendingAckTracker};
pub use retry::{RetryConfig, RetryScheduler};
pub use store::ValueStore;
pub use types::{Gossip, NodeId, Outbound, Value};
