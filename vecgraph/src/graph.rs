//! The HNSW graph engine: level assignment, insertion, layered search,
//! neighbor selection/shrinking, soft delete, update, and rebuild.
//!
//! Per spec.md §5, this type is synchronous end to end — it holds no I/O
//! and no lock of its own. Exclusive access and ordering across mutations
//! is the responsibility of [`crate::queue::MutationQueue`]; this type is
//! the thing the queue serializes access to.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use ordered_float::OrderedFloat;
use rand::Rng;

use crate::heap::{Candidate, WorkingSet};
use crate::node::{Node, NodeId};
use crate::snapshot::{Snapshot, SnapshotNode};
use crate::types::{GraphConfig, Result, SearchParams, SearchResult, VecGraphError};

/// Probability below which a level is not worth a table entry.
const LEVEL_PROBABILITY_EPSILON: f64 = 1e-9;

fn rank_desc(a: &Candidate, b: &Candidate) -> Ordering {
    OrderedFloat(b.similarity)
        .cmp(&OrderedFloat(a.similarity))
        .then_with(|| a.id.cmp(&b.id))
}

/// Build the level probability table for a given `m`: `p(i) = exp(-i/mL) *
/// (1 - exp(-1/mL))` with `mL = 1/ln(M)`, truncated once a level's
/// probability falls below [`LEVEL_PROBABILITY_EPSILON`].
fn level_probabilities(m: usize) -> Vec<f64> {
    let m = m.max(2) as f64;
    let m_l = 1.0 / m.ln();
    let mut table = Vec::new();
    let mut i = 0u32;
    loop {
        let p = (-(i as f64) / m_l).exp() * (1.0 - (-1.0 / m_l).exp());
        if p < LEVEL_PROBABILITY_EPSILON && i > 0 {
            break;
        }
        table.push(p);
        i += 1;
        if i > 4096 {
            break;
        }
    }
    table
}

/// The HNSW graph: a multi-layer proximity index over string-keyed vectors.
pub struct Graph {
    config: GraphConfig,
    dim: Option<usize>,
    nodes: HashMap<NodeId, Node>,
    entry_point: Option<NodeId>,
    lmax: usize,
    level_table: Vec<f64>,
}

impl Graph {
    pub fn new(config: GraphConfig) -> Self {
        let level_table = level_probabilities(config.m);
        Self {
            config,
            dim: None,
            nodes: HashMap::new(),
            entry_point: None,
            lmax: 0,
            level_table,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dim
    }

    pub fn entry_point(&self) -> Option<&NodeId> {
        self.entry_point.as_ref()
    }

    pub fn level_max(&self) -> usize {
        self.lmax
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    fn lmax_cap(&self) -> usize {
        self.level_table.len().saturating_sub(1)
    }

    fn draw_level(&self) -> usize {
        let mut r: f64 = rand::rng().random_range(0.0..1.0);
        for (i, p) in self.level_table.iter().enumerate() {
            if r < *p {
                return i;
            }
            r -= p;
        }
        self.lmax_cap()
    }

    /// Insert or re-insert a point. A no-op if `id` or `v` is empty.
    pub fn add_point(&mut self, id: NodeId, v: Vec<f32>) -> Result<()> {
        if id.is_empty() || v.is_empty() {
            return Ok(());
        }
        if let Some(dim) = self.dim {
            if v.len() != dim {
                return Err(VecGraphError::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
        }

        let level = self.draw_level().min(self.lmax_cap());
        self.insert_at_level(id, v, level)
    }

    /// Insert `id`/`v` at a caller-chosen `level` rather than one drawn from
    /// the level distribution. Used by [`Graph::rebuild_from_snapshot`],
    /// which must preserve each surviving node's original level so that
    /// rebuilding can never raise `Lmax` above its pre-rebuild value
    /// (spec.md §8 scenario 6).
    fn insert_at_level(&mut self, id: NodeId, v: Vec<f32>, level: usize) -> Result<()> {
        if self.nodes.is_empty() {
            self.dim = Some(v.len());
            let node = Node::new(id.clone(), v, level);
            self.nodes.insert(id.clone(), node);
            self.entry_point = Some(id);
            self.lmax = level;
            return Ok(());
        }

        let mut new_node = Node::new(id.clone(), v.clone(), level);

        let entry = self
            .entry_point
            .clone()
            .expect("non-empty graph always has an entry point");
        let mut entry_points = vec![entry];

        for layer in ((level + 1)..=self.lmax).rev() {
            let results = self.search_layer(&v, &entry_points, 1, layer);
            if let Some(top) = results.first() {
                entry_points = vec![top.id.clone()];
            }
        }

        for layer in (0..=level.min(self.lmax)).rev() {
            let w = self.search_layer(&v, &entry_points, self.config.ef_construction, layer);
            let selected = select_neighbors(&w, self.config.max_degree(layer));

            for peer in &selected {
                if new_node.link(layer, &peer.id) {
                    let mut exceeded = false;
                    if let Some(peer_node) = self.nodes.get_mut(&peer.id) {
                        peer_node.link(layer, &id);
                        exceeded = peer_node.neighbors_at(layer).len() > self.config.max_degree(layer);
                    }
                    if exceeded {
                        self.shrink(&peer.id, layer);
                    }
                }
            }

            entry_points = w.iter().map(|c| c.id.clone()).collect();
        }

        if level > self.lmax {
            self.lmax = level;
            self.entry_point = Some(id.clone());
        }

        self.nodes.insert(id, new_node);
        Ok(())
    }

    /// Soft-delete: mark tombstoned, no-op if unknown. Adjacency and the
    /// entry point are left untouched — the node still anchors traversal.
    pub fn remove_point(&mut self, id: &NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.tombstone = true;
        }
    }

    /// Tombstone-then-reinsert. Promotes to a plain insert if `id` is
    /// unknown (spec.md §7: `UnknownId (update)` promotes to insert).
    pub fn update_point(&mut self, id: NodeId, v: Vec<f32>) -> Result<()> {
        match self.nodes.get_mut(&id) {
            Some(node) => node.tombstone = true,
            None => return self.add_point(id, v),
        }
        self.add_point(id, v)
    }

    /// Bounded best-first traversal of a single layer. Tombstoned nodes are
    /// traversed (for connectivity) but are not filtered here — callers
    /// filter tombstones out of final results, per spec.md §4.D.
    fn search_layer(&self, q: &[f32], entry: &[NodeId], ef: usize, layer: usize) -> Vec<Candidate> {
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut candidates = WorkingSet::new();
        let mut results = WorkingSet::new();

        for ep in entry {
            if visited.insert(ep.clone()) {
                if let Some(node) = self.nodes.get(ep) {
                    let sim = self.config.metric.similarity(q, &node.vector);
                    candidates.push(Candidate::new(ep.clone(), sim));
                    results.push(Candidate::new(ep.clone(), sim));
                }
            }
        }
        results.truncate_to(ef);

        while let Some(c) = candidates.pop_first() {
            let f_sim = results
                .peek_last()
                .map(|c| c.similarity)
                .unwrap_or(f32::NEG_INFINITY);
            if c.similarity < f_sim {
                break;
            }

            let Some(node) = self.nodes.get(&c.id) else {
                continue;
            };
            for neighbor_id in node.neighbors_at(layer) {
                if !visited.insert(neighbor_id.clone()) {
                    continue;
                }
                let Some(neighbor) = self.nodes.get(neighbor_id) else {
                    continue;
                };
                let sim = self.config.metric.similarity(q, &neighbor.vector);
                let f_sim = results
                    .peek_last()
                    .map(|c| c.similarity)
                    .unwrap_or(f32::NEG_INFINITY);
                if results.len() < ef || sim > f_sim {
                    candidates.push(Candidate::new(neighbor_id.clone(), sim));
                    results.push(Candidate::new(neighbor_id.clone(), sim));
                    if results.len() > ef {
                        results.pop_last();
                    }
                }
            }
        }

        results.into_sequence()
    }

    /// Top-K search, per spec.md §4.D. Empty if the index has no entry
    /// point yet.
    pub fn search_knn(&self, q: &[f32], params: &SearchParams) -> Result<Vec<SearchResult>> {
        if let Some(dim) = self.dim {
            if q.len() != dim {
                return Err(VecGraphError::DimensionMismatch {
                    expected: dim,
                    actual: q.len(),
                });
            }
        }

        let Some(entry) = self.entry_point.clone() else {
            return Ok(Vec::new());
        };
        let ef = params.ef.unwrap_or(self.config.ef_construction).max(1);

        let mut beam = vec![entry];
        let mut best = WorkingSet::new();

        for layer in (1..=self.lmax).rev() {
            let per_layer_ef = ef.min(params.beam_size).max(1);
            let layer_results = self.search_layer(q, &beam, per_layer_ef, layer);
            for c in &layer_results {
                if !self.is_tombstoned(&c.id) {
                    best.push(c.clone());
                }
            }
            best.truncate_to(params.k.max(ef));
            beam = layer_results
                .iter()
                .take(params.beam_size)
                .map(|c| c.id.clone())
                .collect();
        }

        let bottom = self.search_layer(q, &beam, ef, 0);
        for c in &bottom {
            if !self.is_tombstoned(&c.id) {
                best.push(c.clone());
            }
        }
        best.truncate_to(params.k.max(ef));

        let mut scored: Vec<SearchResult> = best
            .to_sequence()
            .iter()
            .filter(|c| !self.is_tombstoned(&c.id))
            .filter_map(|c| {
                self.nodes.get(&c.id).map(|n| SearchResult {
                    id: c.id.clone(),
                    vector: n.vector.clone(),
                    score: self.config.metric.similarity(q, &n.vector),
                })
            })
            .filter(|r| r.score > params.tau)
            .collect();

        scored.sort_by(|a, b| OrderedFloat(b.score).cmp(&OrderedFloat(a.score)));
        scored.truncate(params.k);
        Ok(scored)
    }

    fn is_tombstoned(&self, id: &NodeId) -> bool {
        self.nodes.get(id).map(|n| n.tombstone).unwrap_or(false)
    }

    /// Rebuild the graph from its own live node records: clears all graph
    /// state, then re-inserts every non-tombstoned node via its original
    /// level. Reusing each node's `top_level` rather than drawing a fresh
    /// one keeps the post-rebuild `Lmax` a subset-max of the pre-rebuild
    /// one, so it can never exceed it (spec.md §8 scenario 6) — a fresh
    /// random draw per node could occasionally land above the old `Lmax`
    /// and violate that invariant. Reports progress in `[0, 100]` after
    /// each node, via `on_progress`.
    pub fn rebuild_from_snapshot(&mut self, mut on_progress: impl FnMut(u8)) -> Result<()> {
        let mut previous: Vec<(NodeId, Vec<f32>, usize, bool)> = self
            .nodes
            .values()
            .map(|n| (n.id.clone(), n.vector.clone(), n.top_level, n.tombstone))
            .collect();
        previous.sort_by(|a, b| a.0.cmp(&b.0));

        self.nodes.clear();
        self.lmax = 0;
        self.entry_point = None;

        if previous.is_empty() {
            on_progress(100);
            return Ok(());
        }

        let total = previous.len();
        for (i, (id, vector, level, tombstone)) in previous.into_iter().enumerate() {
            if !tombstone {
                self.insert_at_level(id, vector, level)?;
            }
            let pct = (((i + 1) * 100) / total).min(100) as u8;
            on_progress(pct);
        }
        Ok(())
    }

    /// Rebuild `node.neighbors(layer)` as the top-`max_degree(layer)`
    /// entries by similarity to `node.vector`, and remove the reverse edge
    /// from every dropped peer so adjacency stays symmetric (spec.md §8's
    /// symmetric-adjacency invariant takes precedence over a literal
    /// one-sided rebuild).
    fn shrink(&mut self, node_id: &NodeId, layer: usize) {
        let max_degree = self.config.max_degree(layer);
        let (vector, current) = match self.nodes.get(node_id) {
            Some(n) if n.neighbors_at(layer).len() > max_degree => {
                (n.vector.clone(), n.neighbors_at(layer).to_vec())
            }
            _ => return,
        };

        let mut scored: Vec<Candidate> = current
            .iter()
            .filter_map(|nid| {
                self.nodes
                    .get(nid)
                    .map(|n| Candidate::new(nid.clone(), self.config.metric.similarity(&vector, &n.vector)))
            })
            .collect();
        scored.sort_by(rank_desc);

        let kept: Vec<NodeId> = scored.iter().take(max_degree).map(|c| c.id.clone()).collect();
        let kept_set: HashSet<&NodeId> = kept.iter().collect();
        let dropped: Vec<NodeId> = current
            .into_iter()
            .filter(|id| !kept_set.contains(id))
            .collect();

        if let Some(node) = self.nodes.get_mut(node_id) {
            node.set_neighbors_at(layer, kept);
        }
        for dropped_id in dropped {
            if let Some(other) = self.nodes.get_mut(&dropped_id) {
                other.unlink(layer, node_id);
            }
        }
    }
    /// Serialize the full graph state into the blob schema of spec.md §6.
    pub fn to_snapshot(&self) -> Snapshot {
        let mut nodes: Vec<(NodeId, SnapshotNode)> = self
            .nodes
            .iter()
            .map(|(id, n)| {
                (
                    id.clone(),
                    SnapshotNode {
                        uniqueid: n.id.clone(),
                        level: n.top_level,
                        vector: n.vector.clone(),
                        neighbors: n.neighbors.clone(),
                        deleted: n.tombstone,
                    },
                )
            })
            .collect();
        nodes.sort_by(|a, b| a.0.cmp(&b.0));

        Snapshot {
            m: self.config.m,
            mmax0: self.config.mmax0,
            ef_construction: self.config.ef_construction,
            level_max: self.lmax,
            entry_point_id: self.entry_point.clone().unwrap_or_default(),
            metric: self.config.metric,
            nodes,
        }
    }

    /// Replace the graph state wholesale from a snapshot (spec.md §6:
    /// `fromSnapshot`).
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mmax0 = if snapshot.mmax0 == 0 { snapshot.m } else { snapshot.mmax0 };
        let config = GraphConfig {
            m: snapshot.m,
            mmax0,
            ef_construction: snapshot.ef_construction,
            metric: snapshot.metric,
        };
        let level_table = level_probabilities(config.m);
        let dim = snapshot.nodes.first().map(|(_, n)| n.vector.len());

        let nodes = snapshot
            .nodes
            .into_iter()
            .map(|(id, sn)| {
                let node = Node {
                    id: sn.uniqueid,
                    vector: sn.vector,
                    top_level: sn.level,
                    neighbors: sn.neighbors,
                    tombstone: sn.deleted,
                };
                (id, node)
            })
            .collect();

        let entry_point = if snapshot.entry_point_id.is_empty() {
            None
        } else {
            Some(snapshot.entry_point_id)
        };

        Self {
            config,
            dim,
            nodes,
            entry_point,
            lmax: snapshot.level_max,
            level_table,
        }
    }
}

/// `selectNeighbors(W, k)`: the first `k` entries of `W` in comparator
/// order. No diversity heuristic — simple top-k, per spec.md §4.D.
fn select_neighbors(w: &[Candidate], k: usize) -> Vec<Candidate> {
    w.iter().take(k).cloned().collect()
}
