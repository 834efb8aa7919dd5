//! Embedded HNSW approximate-nearest-neighbor vector index.
//!
//! Hierarchical Navigable Small World graphs for fast approximate nearest
//! neighbor search over float vectors, with soft delete, snapshot
//! persistence, and a single-writer mutation queue for safe concurrent
//! access.
//!
//! # Example
//!
//! ```rust,no_run
//! use vecgraph::{Graph, GraphConfig, Metric, SearchParams};
//!
//! # fn example() -> vecgraph::Result<()> {
//! let mut graph = Graph::new(GraphConfig::new(16, Metric::Cosine));
//! graph.add_point("doc-1".to_string(), vec![0.1; 384])?;
//!
//! let results = graph.search_knn(&[0.1_f32; 384], &SearchParams::new(10))?;
//! # Ok(())
//! # }
//! ```

mod distance;
mod facade;
mod graph;
mod heap;
mod node;
mod queue;
mod snapshot;
mod types;

pub use distance::Metric;
pub use facade::VecGraphHandle;
pub use graph::Graph;
pub use heap::Candidate;
pub use node::{Node, NodeId};
pub use queue::{GraphMutation, InlineExecutor, MutationExecutor, MutationQueue};
pub use snapshot::{Snapshot, SnapshotNode};
pub use types::{GraphConfig, Result, SearchParams, SearchResult, VecGraphError};

pub use vecgraph_storage::{RocksSnapshotStore, SnapshotStore, StorageConfig};
