//! Gossip Engine - the broadcast protocol state machine.
//!
//! The engine owns the [`ValueStore`], [`NeighborTable`] and
//! [`PendingAckTracker`] of one node. Each operation mutates that state and
//! returns the messages the node should send; it never performs I/O itself.
//! Callers hold one lock around the engine, take the returned
//! [`Outbound`] list, drop the lock and only then hand the messages to the
//! transport.
//!
//! # Message Flow
//!
//! ```text
//!   client ── v ──► accept_external_value ──► Value(v) to every neighbor
//!   peer s ── v ──► receive_gossip        ──► Value(v) to neighbors except s
//!                                         └─► Ack(v) to s (always)
//!   peer s ─ ack ─► receive_ack           ──► (nothing)
//! ```

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::{NeighborTable, NodeId, Outbound, PendingAckTracker, Value, ValueStore};

/// Snapshot of engine counters for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Distinct values held.
    pub values: usize,
    /// Current neighbor count.
    pub neighbors: usize,
    /// Outstanding (value, neighbor) pairs.
    pub pending: usize,
    /// Resends handed out by retry batches.
    pub retries: u64,
}

/// Broadcast protocol state for a single node.
#[derive(Debug)]
pub struct GossipEngine {
    id: NodeId,
    store: ValueStore,
    neighbors: NeighborTable,
    pending: PendingAckTracker,
}

impl GossipEngine {
    /// Create an engine with no neighbors and no values.
    pub fn new(id: NodeId) -> Self {
        Self {
            neighbors: NeighborTable::new(id.clone()),
            id,
            store: ValueStore::new(),
            pending: PendingAckTracker::new(),
        }
    }

    /// Cap how many records one [`retry_due`](Self::retry_due) call resends.
    pub fn set_batch_limit(&mut self, limit: Option<usize>) {
        self.pending.set_batch_limit(limit);
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// A client submitted a value.
    ///
    /// If the value is novel it is tracked and sent to every neighbor. The
    /// client reply does not depend on the result and is the caller's job.
    pub fn accept_external_value(&mut self, value: Value) -> Vec<Outbound> {
        self.accept_external_value_at(value, Instant::now())
    }

    pub fn accept_external_value_at(&mut self, value: Value, now: Instant) -> Vec<Outbound> {
        if !self.store.insert(value) {
            trace!(node = %self.id, value, "Client value already known");
            return Vec::new();
        }

        debug!(node = %self.id, value, neighbors = self.neighbors.len(), "Accepted client value");
        self.fan_out(value, None, now)
    }

    /// A peer forwarded a value.
    ///
    /// Novel values are fanned out to every neighbor except `sender`. The
    /// sender is always acked, and any pending record for `(value, sender)`
    /// is cleared since the sender evidently holds the value.
    pub fn receive_gossip(&mut self, value: Value, sender: &NodeId) -> Vec<Outbound> {
        self.receive_gossip_at(value, sender, Instant::now())
    }

    pub fn receive_gossip_at(&mut self, value: Value, sender: &NodeId, now: Instant) -> Vec<Outbound> {
        let mut out = if self.store.insert(value) {
            debug!(node = %self.id, value, from = %sender, "Received novel gossip");
            self.fan_out(value, Some(sender), now)
        } else {
            trace!(node = %self.id, value, from = %sender, "Received duplicate gossip");
            Vec::new()
        };

        if self.pending.acknowledge(value, sender) {
            trace!(node = %self.id, value, from = %sender, "Gossip cleared pending entry");
        }

        out.push(Outbound::ack(sender.clone(), value));
        out
    }

    /// A peer confirmed it holds `value`. Stale or repeated acks are ignored.
    pub fn receive_ack(&mut self, value: Value, sender: &NodeId) -> bool {
        let cleared = self.pending.acknowledge(value, sender);
        trace!(node = %self.id, value, from = %sender, cleared, "Received ack");
        cleared
    }

    /// Every value observed so far.
    pub fn read(&self) -> BTreeSet<Value> {
        self.store.snapshot()
    }

    /// Merge a neighbor list from the topology.
    ///
    /// Neighbors that were not known before are sent every value already
    /// held, so a late topology update still converges.
    pub fn apply_topology<I>(&mut self, ids: I) -> Vec<Outbound>
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.apply_topology_at(ids, Instant::now())
    }

    pub fn apply_topology_at<I>(&mut self, ids: I, now: Instant) -> Vec<Outbound>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let added = self.neighbors.set_neighbors(ids);
        debug!(
            node = %self.id,
            added = added.len(),
            neighbors = self.neighbors.len(),
            "Applied topology"
        );

        let mut out = Vec::new();
        if self.store.is_empty() {
            return out;
        }
        let values = self.store.snapshot();
        for neighbor in added {
            for &value in &values {
                if self.pending.track_at(value, neighbor.clone(), now) {
                    out.push(Outbound::value(neighbor.clone(), value));
                }
            }
        }
        out
    }

    /// Resend every pending pair that has waited at least `grace`.
    ///
    /// Records stay tracked until acknowledged.
    pub fn retry_due(&mut self, grace: Duration) -> Vec<Outbound> {
        self.retry_due_at(grace, Instant::now())
    }

    pub fn retry_due_at(&mut self, grace: Duration, now: Instant) -> Vec<Outbound> {
        self.pending
            .next_retry_batch_at(grace, now)
            .into_iter()
            .map(|p| Outbound::value(p.neighbor, p.value))
            .collect()
    }

    pub fn contains(&self, value: Value) -> bool {
        self.store.contains(value)
    }

    pub fn neighbors(&self) -> &[NodeId] {
        self.neighbors.neighbors()
    }

    pub fn pending(&self) -> &PendingAckTracker {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.count()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            values: self.store.len(),
            neighbors: self.neighbors.len(),
            pending: self.pending.count(),
            retries: self.pending.total_retries(),
        }
    }

    fn fan_out(&mut self, value: Value, exclude: Option<&NodeId>, now: Instant) -> Vec<Outbound> {
        let mut out = Vec::with_capacity(self.neighbors.len());
        for neighbor in self.neighbors.neighbors() {
            if Some(neighbor) == exclude {
                continue;
            }
            if self.pending.track_at(value, neighbor.clone(), now) {
                out.push(Outbound::value(neighbor.clone(), value));
            }
        }
        out
    }
}
