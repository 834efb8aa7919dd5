//! Property-based tests for the graph engine invariants (spec.md §8).
//!
//! Adapted from the teacher's vector-index property suite: string ids and
//! a similarity-is-higher-better scoring convention instead of `VectorId`/
//! raw distance, plus soft-delete and degree-bound properties this index
//! adds on top of what the teacher tests.

use std::collections::HashSet;

use proptest::prelude::*;
use vecgraph::{Graph, GraphConfig, Metric, SearchParams};

fn vector_strategy(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0f32, dim..=dim)
}

fn id_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}-[0-9]{1,4}"
}

proptest! {
    /// After inserting a vector, searching for it should return it as its
    /// own nearest neighbor.
    #[test]
    fn insert_and_search_consistency(
        points in prop::collection::vec((id_strategy(), vector_strategy(16)), 1..40)
    ) {
        let mut seen = HashSet::new();
        let mut graph = Graph::new(GraphConfig::new(8, Metric::Cosine));
        let mut inserted = Vec::new();

        for (id, vector) in points {
            if !seen.insert(id.clone()) {
                continue;
            }
            graph.add_point(id.clone(), vector.clone()).unwrap();
            inserted.push((id, vector));
        }

        for (id, vector) in &inserted {
            let results = graph
                .search_knn(vector, &SearchParams::new(1).with_tau(-1.0))
                .unwrap();
            prop_assert!(!results.is_empty());
            prop_assert_eq!(&results[0].id, id);
        }
    }

    /// Removing a point must exclude it from every subsequent search.
    #[test]
    fn remove_excludes_from_search(
        target_id in id_strategy(),
        target in vector_strategy(12),
        others in prop::collection::vec((id_strategy(), vector_strategy(12)), 5..20)
    ) {
        let mut graph = Graph::new(GraphConfig::new(8, Metric::Euclidean));
        graph.add_point(target_id.clone(), target.clone()).unwrap();
        for (id, vector) in others {
            if id != target_id {
                graph.add_point(id, vector).unwrap();
            }
        }

        let before = graph
            .search_knn(&target, &SearchParams::new(10).with_tau(-1.0))
            .unwrap();
        prop_assert!(before.iter().any(|r| r.id == target_id));

        graph.remove_point(&target_id);

        let after = graph
            .search_knn(&target, &SearchParams::new(10).with_tau(-1.0))
            .unwrap();
        prop_assert!(!after.iter().any(|r| r.id == target_id));
    }

    /// `search_knn` never returns more than `k` results.
    #[test]
    fn search_returns_at_most_k(
        query in vector_strategy(8),
        points in prop::collection::vec((id_strategy(), vector_strategy(8)), 10..60),
        k in 1usize..15usize
    ) {
        let mut graph = Graph::new(GraphConfig::new(8, Metric::Cosine));
        let mut seen = HashSet::new();
        for (id, vector) in points {
            if seen.insert(id.clone()) {
                graph.add_point(id, vector).unwrap();
            }
        }

        let results = graph
            .search_knn(&query, &SearchParams::new(k).with_tau(-1.0))
            .unwrap();
        prop_assert!(results.len() <= k);
    }

    /// Results are sorted most-similar first.
    #[test]
    fn search_results_sorted_descending(
        query in vector_strategy(10),
        points in prop::collection::vec((id_strategy(), vector_strategy(10)), 10..40)
    ) {
        let mut graph = Graph::new(GraphConfig::new(8, Metric::Cosine));
        let mut seen = HashSet::new();
        for (id, vector) in points {
            if seen.insert(id.clone()) {
                graph.add_point(id, vector).unwrap();
            }
        }

        let results = graph
            .search_knn(&query, &SearchParams::new(10).with_tau(-1.0))
            .unwrap();
        for pair in results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    /// Re-inserting an existing id (`update_point`) must not create a
    /// second live record — the id stays unique and reflects the new
    /// vector.
    #[test]
    fn update_keeps_id_unique(
        id in id_strategy(),
        first in vector_strategy(6),
        second in vector_strategy(6)
    ) {
        let mut graph = Graph::new(GraphConfig::new(8, Metric::Cosine));
        graph.add_point(id.clone(), first).unwrap();
        graph.update_point(id.clone(), second.clone()).unwrap();

        let results = graph
            .search_knn(&second, &SearchParams::new(5).with_tau(-1.0))
            .unwrap();
        let matches: Vec<_> = results.iter().filter(|r| r.id == id).collect();
        prop_assert_eq!(matches.len(), 1);
        prop_assert_eq!(&matches[0].vector, &second);
    }

    /// No node's per-layer adjacency ever exceeds its configured degree
    /// bound, under arbitrary insertion order.
    #[test]
    fn degree_bound_holds(
        points in prop::collection::vec((id_strategy(), vector_strategy(6)), 5..60)
    ) {
        let config = GraphConfig::new(6, Metric::Cosine);
        let mut graph = Graph::new(config.clone());
        let mut seen = HashSet::new();
        for (id, vector) in points {
            if seen.insert(id.clone()) {
                graph.add_point(id, vector).unwrap();
            }
        }

        for id in graph.node_ids() {
            let node = graph.get_node(id).unwrap();
            for level in 0..=node.top_level {
                prop_assert!(node.neighbors_at(level).len() <= config.max_degree(level));
            }
        }
    }

    /// A snapshot round trip preserves every live node's vector and
    /// tombstone state.
    #[test]
    fn snapshot_round_trip_preserves_points(
        points in prop::collection::vec((id_strategy(), vector_strategy(6)), 1..30)
    ) {
        let mut graph = Graph::new(GraphConfig::new(8, Metric::Cosine));
        let mut seen = HashSet::new();
        for (id, vector) in &points {
            if seen.insert(id.clone()) {
                graph.add_point(id.clone(), vector.clone()).unwrap();
            }
        }

        let snapshot = graph.to_snapshot();
        let restored = Graph::from_snapshot(snapshot);

        prop_assert_eq!(restored.len(), graph.len());
        for id in graph.node_ids() {
            prop_assert_eq!(
                restored.get_node(id).map(|n| n.vector.clone()),
                graph.get_node(id).map(|n| n.vector.clone())
            );
        }
    }
}
