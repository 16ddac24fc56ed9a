//! Pending Acknowledgment Tracking
//!
//! A pending record `(value, neighbor)` means "this node sent `value` to
//! `neighbor` and has not heard back". Records are created the first time a
//! novel value is forwarded and are destroyed by an explicit ack or by the
//! neighbor sending the value to us.
//!
//! # Retry Order
//!
//! Records live in a map for O(1) ack, and in a FIFO queue ordered by the
//! time they were last sent. [`next_retry_batch`](PendingAckTracker::next_retry_batch)
//! pops from the front while the head is old enough and pushes every resent
//! record to the back, so the queue stays sorted and every record is
//! eventually retried:
//!
//! ```text
//!   front ─► (5,n2)@t0  (5,n3)@t0  (9,n2)@t4 ◄─ back
//!                 │          │
//!                 └──────────┴──► resent at t8, re-queued behind (9,n2)
//! ```
//!
//! Acked records are removed from the map only; their queue slots are
//! skipped lazily and compacted once they dominate the queue.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::{NodeId, Value};

/// Stale queue slots tolerated before compaction.
const COMPACT_SLACK: usize = 64;

/// A (value, neighbor) pair awaiting acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingAck {
    pub value: Value,
    pub neighbor: NodeId,
}

impl PendingAck {
    pub fn new(value: Value, neighbor: NodeId) -> Self {
        Self { value, neighbor }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Distinguishes this record from an earlier one with the same key
    /// whose queue slot may still be around.
    seq: u64,
    last_sent: Instant,
    attempts: u32,
}

/// Outstanding (value, neighbor) obligations with FIFO retry selection.
#[derive(Debug, Default)]
pub struct PendingAckTracker {
    entries: HashMap<PendingAck, Entry>,
    queue: VecDeque<(u64, PendingAck)>,
    next_seq: u64,
    batch_limit: Option<usize>,
    retries: u64,
}

impl PendingAckTracker {
    /// Create an empty tracker with no batch limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of records a single retry batch may return.
    #[must_use]
    pub fn with_batch_limit(mut self, limit: Option<usize>) -> Self {
        self.batch_limit = limit;
        self
    }

    pub fn set_batch_limit(&mut self, limit: Option<usize>) {
        self.batch_limit = limit;
    }

    /// Record that `value` awaits an ack from `neighbor`.
    ///
    /// Returns false if the pair was already tracked (nothing changes).
    pub fn track(&mut self, value: Value, neighbor: NodeId) -> bool {
        self.track_at(value, neighbor, Instant::now())
    }

    /// [`track`](Self::track) with an explicit send time.
    pub fn track_at(&mut self, value: Value, neighbor: NodeId, now: Instant) -> bool {
        let key = PendingAck::new(value, neighbor);
        if self.entries.contains_key(&key) {
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key.clone(),
            Entry {
                seq,
                last_sent: now,
                attempts: 1,
            },
        );
        self.queue.push_back((seq, key));
        true
    }

    /// Clear the record for a pair. Stale or duplicate acks are a no-op.
    ///
    /// Returns true if a record was removed.
    pub fn acknowledge(&mut self, value: Value, neighbor: &NodeId) -> bool {
        let key = PendingAck::new(value, neighbor.clone());
        let removed = self.entries.remove(&key).is_some();
        if removed {
            self.maybe_compact();
        }
        removed
    }

    /// Records that have gone at least `max_age` since they were last sent,
    /// oldest first. Each returned record counts as resent now.
    pub fn next_retry_batch(&mut self, max_age: Duration) -> Vec<PendingAck> {
        self.next_retry_batch_at(max_age, Instant::now())
    }

    /// [`next_retry_batch`](Self::next_retry_batch) against an explicit clock.
    pub fn next_retry_batch_at(&mut self, max_age: Duration, now: Instant) -> Vec<PendingAck> {
        let mut batch = Vec::new();
        let mut requeue = Vec::new();

        loop {
            if self.batch_limit.is_some_and(|limit| batch.len() >= limit) {
                break;
            }
            let Some((seq, key)) = self.queue.pop_front() else {
                break;
            };
            let Some(entry) = self.entries.get_mut(&key) else {
                continue;
            };
            if entry.seq != seq {
                continue;
            }
            if now.saturating_duration_since(entry.last_sent) < max_age {
                self.queue.push_front((seq, key));
                break;
            }

            entry.last_sent = now;
            entry.attempts = entry.attempts.saturating_add(1);
            batch.push(key.clone());
            requeue.push((seq, key));
        }

        self.retries += batch.len() as u64;
        self.queue.extend(requeue);
        batch
    }

    /// Number of outstanding pairs.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether a pair is outstanding.
    pub fn contains(&self, value: Value, neighbor: &NodeId) -> bool {
        self.entries
            .contains_key(&PendingAck::new(value, neighbor.clone()))
    }

    /// How many times the pair has been sent, including the first send.
    pub fn attempts(&self, value: Value, neighbor: &NodeId) -> Option<u32> {
        self.entries
            .get(&PendingAck::new(value, neighbor.clone()))
            .map(|e| e.attempts)
    }

    /// Total resends handed out by retry batches.
    pub fn total_retries(&self) -> u64 {
        self.retries
    }

    fn maybe_compact(&mut self) {
        if self.queue.len() <= self.entries.len() * 2 + COMPACT_SLACK {
            return;
        }
        let entries = &self.entries;
        self.queue
            .retain(|(seq, key)| entries.get(key).is_some_and(|e| e.seq == *seq));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: &str) -> NodeId {
        NodeId::from(id)
    }

    #[test]
    fn track_is_idempotent() {
        let mut tracker = PendingAckTracker::new();
        assert!(tracker.track(5, n("n2")));
        assert!(!tracker.track(5, n("n2")));
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn acknowledge_removes_once() {
        let mut tracker = PendingAckTracker::new();
        tracker.track(5, n("n2"));
        tracker.track(5, n("n3"));

        assert!(tracker.acknowledge(5, &n("n2")));
        assert!(!tracker.acknowledge(5, &n("n2")));
        assert!(!tracker.acknowledge(6, &n("n3")));
        assert_eq!(tracker.count(), 1);
        assert!(tracker.contains(5, &n("n3")));
    }

    #[test]
    fn retry_batch_respects_age() {
        let t0 = Instant::now();
        let mut tracker = PendingAckTracker::new();
        tracker.track_at(1, n("n2"), t0);
        tracker.track_at(2, n("n2"), t0 + Duration::from_millis(300));

        let grace = Duration::from_millis(200);
        let batch = tracker.next_retry_batch_at(grace, t0 + Duration::from_millis(100));
        assert!(batch.is_empty());

        let batch = tracker.next_retry_batch_at(grace, t0 + Duration::from_millis(250));
        assert_eq!(batch, vec![PendingAck::new(1, n("n2"))]);

        // Just resent: not due again until another grace period passes.
        let batch = tracker.next_retry_batch_at(grace, t0 + Duration::from_millis(300));
        assert!(batch.is_empty());

        let batch = tracker.next_retry_batch_at(grace, t0 + Duration::from_millis(500));
        assert_eq!(
            batch,
            vec![PendingAck::new(2, n("n2")), PendingAck::new(1, n("n2"))]
        );
        assert_eq!(tracker.attempts(1, &n("n2")), Some(3));
        assert_eq!(tracker.total_retries(), 3);
    }

    #[test]
    fn retry_skips_acknowledged() {
        let t0 = Instant::now();
        let mut tracker = PendingAckTracker::new();
        tracker.track_at(1, n("n2"), t0);
        tracker.track_at(2, n("n3"), t0);
        tracker.acknowledge(1, &n("n2"));

        let batch = tracker.next_retry_batch_at(Duration::ZERO, t0);
        assert_eq!(batch, vec![PendingAck::new(2, n("n3"))]);
    }

    #[test]
    fn retrack_after_ack_is_not_duplicated() {
        let t0 = Instant::now();
        let mut tracker = PendingAckTracker::new();
        tracker.track_at(1, n("n2"), t0);
        tracker.acknowledge(1, &n("n2"));
        tracker.track_at(1, n("n2"), t0);

        let batch = tracker.next_retry_batch_at(Duration::ZERO, t0);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn batch_limit_rotates_without_starvation() {
        let t0 = Instant::now();
        let mut tracker = PendingAckTracker::new().with_batch_limit(Some(2));
        for v in 0..5 {
            tracker.track_at(v, n("n2"), t0);
        }

        let mut seen = Vec::new();
        for round in 1..=3u64 {
            let now = t0 + Duration::from_millis(round);
            seen.extend(
                tracker
                    .next_retry_batch_at(Duration::ZERO, now)
                    .into_iter()
                    .map(|p| p.value),
            );
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn compaction_drops_stale_slots() {
        let t0 = Instant::now();
        let mut tracker = PendingAckTracker::new();
        for v in 0..200 {
            tracker.track_at(v, n("n2"), t0);
        }
        for v in 0..199 {
            tracker.acknowledge(v, &n("n2"));
        }

        assert_eq!(tracker.count(), 1);
        assert!(tracker.queue.len() <= 2 + COMPACT_SLACK);
        let batch = tracker.next_retry_batch_at(Duration::ZERO, t0);
        assert_eq!(batch, vec![PendingAck::new(199, n("n2"))]);
    }
}
