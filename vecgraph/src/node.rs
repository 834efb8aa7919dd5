//! Per-point state stored in the graph.

use serde::{Deserialize, Serialize};

/// Opaque, non-empty string identifying a point. Unique across live nodes.
pub type NodeId = String;

/// A single point in the index: its vector, the highest layer it
/// participates in, its per-layer adjacency, and its tombstone flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub vector: Vec<f32>,
    pub top_level: usize,
    /// `neighbors[level]` is the ordered list of peer ids at that level,
    /// for `level` in `0..=top_level`. Bounded by `M` (or `Mmax0` at level 0).
    pub neighbors: Vec<Vec<NodeId>>,
    /// Logically deleted: excluded from search results, still traversed.
    pub tombstone: bool,
}

impl Node {
    pub fn new(id: NodeId, vector: Vec<f32>, top_level: usize) -> Self {
        let neighbors = (0..=top_level).map(|_| Vec::new()).collect();
        Self {
            id,
            vector,
            top_level,
            neighbors,
            tombstone: false,
        }
    }

    /// Neighbors at `level`, or an empty slice if the node doesn't reach it.
    pub fn neighbors_at(&self, level: usize) -> &[NodeId] {
        self.neighbors.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add `peer` to this node's adjacency at `level` if not already present
    /// and not a self-loop or an empty-string legacy sentinel. Returns
    /// whether the edge was newly added.
    pub fn link(&mut self, level: usize, peer: &NodeId) -> bool {
        if peer.is_empty() || peer == &self.id {
            return false;
        }
        let Some(list) = self.neighbors.get_mut(level) else {
            return false;
        };
        list.retain(|p| !p.is_empty());
        if list.contains(peer) {
            return false;
        }
        list.push(peer.clone());
        true
    }

    /// Remove `peer` from this node's adjacency at `level`.
    pub fn unlink(&mut self, level: usize, peer: &NodeId) {
        if let Some(list) = self.neighbors.get_mut(level) {
            list.retain(|p| p != peer);
        }
    }

    /// Replace this node's adjacency at `level` wholesale (used by shrink).
    pub fn set_neighbors_at(&mut self, level: usize, peers: Vec<NodeId>) {
        if let Some(list) = self.neighbors.get_mut(level) {
            *list = peers;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_rejects_self_loop_and_empty_id() {
        let mut n = Node::new("a".into(), vec![1.0], 0);
        assert!(!n.link(0, &"a".to_string()));
        assert!(!n.link(0, &String::new()));
        assert!(n.neighbors_at(0).is_empty());
    }

    #[test]
    fn link_prunes_legacy_empty_entries() {
        let mut n = Node::new("a".into(), vec![1.0], 0);
        n.neighbors[0].push(String::new());
        n.neighbors[0].push("b".into());
        assert!(n.link(0, &"c".to_string()));
        assert_eq!(n.neighbors_at(0), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn link_is_idempotent() {
        let mut n = Node::new("a".into(), vec![1.0], 0);
        assert!(n.link(0, &"b".to_string()));
        assert!(!n.link(0, &"b".to_string()));
        assert_eq!(n.neighbors_at(0).len(), 1);
    }
}
