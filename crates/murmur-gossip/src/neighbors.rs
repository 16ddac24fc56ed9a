//! Neighbor set assigned by the external topology.
//!
//! Repeated topology updates are merged: the table is the union of every
//! update received, in first-seen order. Merging the same list twice is a
//! no-op, so a re-delivered `topology` message cannot change anything.

use std::collections::HashSet;

use crate::NodeId;

/// The peers this node gossips to.
#[derive(Debug, Clone)]
pub struct NeighborTable {
    /// This node's own id, never admitted as a neighbor.
    own_id: NodeId,
    /// Neighbors in first-seen order.
    neighbors: Vec<NodeId>,
    /// Membership index over `neighbors`.
    index: HashSet<NodeId>,
}

impl NeighborTable {
    /// Create an empty table for the given node.
    pub fn new(own_id: NodeId) -> Self {
        Self {
            own_id,
            neighbors: Vec::new(),
            index: HashSet::new(),
        }
    }

    /// Merge a neighbor list into the table.
    ///
    /// The node's own id and duplicates are dropped. Returns the ids that
    /// were not neighbors before this call, in the order given.
    pub fn set_neighbors<I>(&mut self, ids: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut added = Vec::new();
        for id in ids {
            if id == self.own_id || self.index.contains(&id) {
                continue;
            }
            self.index.insert(id.clone());
            self.neighbors.push(id.clone());
            added.push(id);
        }
        added
    }

    /// Current neighbors, stable for the life of the process.
    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    /// Check whether a node is a neighbor.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains(id)
    }

    /// Number of neighbors.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Check if no topology has been applied yet (or it was empty).
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn own_id(&self) -> &NodeId {
        &self.own_id
    }
}
