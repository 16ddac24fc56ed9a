//! Grow-only set of accepted values.

use std::collections::{BTreeSet, HashSet};

use crate::Value;

/// Every distinct value this node has ever accepted.
///
/// Values are never removed. The store never sends anything itself; when
/// [`insert`](Self::insert) reports a novel value the caller is responsible
/// for disseminating it.
#[derive(Debug, Default, Clone)]
pub struct ValueStore {
    values: HashSet<Value>,
}

impl ValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            values: HashSet::new(),
        }
    }

    /// Check whether a value has been accepted.
    pub fn contains(&self, value: Value) -> bool {
        self.values.contains(&value)
    }

    /// Add a value. Returns true iff it was not already present.
    pub fn insert(&mut self, value: Value) -> bool {
        self.values.insert(value)
    }

    /// Point-in-time copy of every value, in ascending order.
    pub fn snapshot(&self) -> BTreeSet<Value> {
        self.values.iter().copied().collect()
    }

    /// Iterate over stored values in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        self.values.iter().copied()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_novelty() {
        let mut store = ValueStore::new();
        assert!(store.insert(5));
        assert!(!store.insert(5));
        assert!(store.contains(5));
        assert!(!store.contains(6));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshot_is_independent() {
        let mut store = ValueStore::new();
        store.insert(3);
        store.insert(1);

        let mut snap = store.snapshot();
        snap.insert(99);
        store.insert(2);

        assert_eq!(snap.into_iter().collect::<Vec<_>>(), vec![1, 3, 99]);
        assert_eq!(store.snapshot().into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn consecutive_snapshots_match() {
        let mut store = ValueStore::new();
        for v in [10, -4, 7] {
            store.insert(v);
        }
        assert_eq!(store.snapshot(), store.snapshot());
    }
}
