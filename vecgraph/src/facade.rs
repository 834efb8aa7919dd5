//! Thin command façade (spec.md §6) composing the graph engine, its
//! mutation queue, and a persistent snapshot adapter into one handle.
//!
//! Grounded on the teacher's `PersistentVectorIndex`: create/open against a
//! named snapshot, mutate through the in-memory index, and persist on
//! `flush`. Unlike the teacher, persistence here is a single opaque blob
//! (spec.md §4.E) rather than one storage key per vector — so `flush` is
//! the only point at which the adapter is touched, and there is no
//! per-insert write-through.

use std::sync::Arc;

use tracing::{info, instrument};

use vecgraph_storage::{SnapshotStore, PRIMARY_KEY};

use crate::distance::Metric;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::queue::MutationQueue;
use crate::snapshot::Snapshot;
use crate::types::{GraphConfig, Result, SearchParams, SearchResult, VecGraphError};

/// A named, persistence-backed HNSW index.
///
/// Writes go through the internal [`MutationQueue`] so concurrent callers
/// never interleave mutations; reads bypass it. Call [`VecGraphHandle::flush`]
/// to persist the current live graph as a snapshot blob.
pub struct VecGraphHandle<S: SnapshotStore> {
    name: String,
    queue: MutationQueue,
    store: Arc<S>,
}

impl<S: SnapshotStore> VecGraphHandle<S> {
    /// Start a brand-new, empty index backed by `store`.
    pub fn create(name: impl Into<String>, config: GraphConfig, store: Arc<S>) -> Self {
        let (queue, _worker) = MutationQueue::spawn(Graph::new(config), 256);
        Self {
            name: name.into(),
            queue,
            store,
        }
    }

    /// Reopen an index by loading its snapshot blob from `store`. Returns
    /// [`VecGraphError::SnapshotMissing`] if no blob is stored under this
    /// name yet.
    #[instrument(skip(store))]
    pub async fn open(name: impl Into<String>, store: Arc<S>) -> Result<Self> {
        let name = name.into();
        let blob = store
            .get_blob(PRIMARY_KEY)
            .await
            .map_err(|e| VecGraphError::StorageUnavailable(e.to_string()))?
            .ok_or_else(|| VecGraphError::SnapshotMissing(name.clone()))?;

        let snapshot = Snapshot::from_bytes(&blob)?;
        let graph = Graph::from_snapshot(snapshot);
        let (queue, _worker) = MutationQueue::spawn(graph, 256);
        info!(index = %name, "reopened index from snapshot");
        Ok(Self { name, queue, store })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn insert(&self, id: NodeId, vector: Vec<f32>) -> Result<()> {
        self.queue.add_point(id, vector).await
    }

    pub async fn delete(&self, id: NodeId) -> Result<()> {
        self.queue.remove_point(id).await
    }

    pub async fn update(&self, id: NodeId, vector: Vec<f32>) -> Result<()> {
        self.queue.update_point(id, vector).await
    }

    pub async fn search(&self, query: &[f32], params: SearchParams) -> Result<Vec<SearchResult>> {
        self.queue.search_knn(query, params).await
    }

    /// Compact away tombstoned points by rebuilding the graph from its own
    /// live nodes (spec.md §4.D `rebuildFromSnapshot`).
    pub async fn compact(&self) -> Result<()> {
        self.queue.rebuild().await
    }

    pub async fn len(&self) -> usize {
        self.queue.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.is_empty().await
    }

    /// Persist the current live graph as this index's snapshot blob.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> Result<()> {
        let snapshot = self.queue.to_snapshot().await;
        let bytes = snapshot.to_bytes()?;
        self.store
            .put_blob(PRIMARY_KEY, bytes)
            .await
            .map_err(|e| VecGraphError::StorageUnavailable(e.to_string()))?;
        info!(index = %self.name, "flushed snapshot");
        Ok(())
    }
}

/// The distance metric configured for an index — convenience re-export so
/// callers building a [`GraphConfig`] don't need a second `use`.
pub use Metric as IndexMetric;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vecgraph_storage::{RocksSnapshotStore, StorageConfig};

    async fn open_store(dir: &std::path::Path) -> Arc<RocksSnapshotStore> {
        Arc::new(
            RocksSnapshotStore::open_with_config(dir, "ix", StorageConfig::default())
                .expect("open store"),
        )
    }

    #[tokio::test]
    async fn flush_then_open_round_trips() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;

        {
            let handle = VecGraphHandle::create("ix", GraphConfig::new(8, Metric::Cosine), store.clone());
            handle.insert("a".into(), vec![1.0, 0.0]).await.unwrap();
            handle.insert("b".into(), vec![0.0, 1.0]).await.unwrap();
            handle.flush().await.unwrap();
        }

        let reopened = VecGraphHandle::open("ix", store).await.unwrap();
        assert_eq!(reopened.len().await, 2);
    }

    #[tokio::test]
    async fn open_without_snapshot_fails() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let err = VecGraphHandle::open("missing", store).await.unwrap_err();
        assert!(matches!(err, VecGraphError::SnapshotMissing(_)));
    }

    #[tokio::test]
    async fn compact_removes_tombstoned_entries() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let handle = VecGraphHandle::create("ix", GraphConfig::new(8, Metric::Cosine), store);
        handle.insert("a".into(), vec![1.0, 0.0]).await.unwrap();
        handle.insert("b".into(), vec![0.0, 1.0]).await.unwrap();
        handle.delete("a".into()).await.unwrap();
        handle.compact().await.unwrap();
        assert_eq!(handle.len().await, 1);
    }
}
