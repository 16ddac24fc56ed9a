//! Unique id generation for `generate` requests.
//!
//! Ids combine the node id, the wall-clock time the generator was created
//! and a monotonic per-node counter. The node id separates nodes, the counter
//! separates calls within one process and the timestamp separates restarts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use murmur_gossip::NodeId;

#[derive(Debug)]
pub struct IdGenerator {
    node: NodeId,
    epoch_ms: u128,
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new(node: NodeId) -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self {
            node,
            epoch_ms,
            counter: AtomicU64::new(0),
        }
    }

    /// Next id, e.g. `n1-1729252800000-7`.
    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{}", self.node, self.epoch_ms, n)
    }
}
