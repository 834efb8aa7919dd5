//! Mutation serializer (spec.md §4.F): a single-writer FIFO queue in front
//! of the synchronous [`crate::graph::Graph`].
//!
//! The graph engine holds no lock of its own (spec.md §5). All writes —
//! insert, remove, update, rebuild — are funneled through one `mpsc`
//! channel and applied by a single background task, so mutations are
//! strictly ordered and never interleave. Reads take a `RwLock` read guard
//! directly and bypass the queue, matching spec.md §5's "reads may run
//! concurrently with a queued write, against whatever state is currently
//! committed".

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

use crate::graph::Graph;
use crate::node::NodeId;
use crate::snapshot::Snapshot;
use crate::types::{Result, SearchParams, SearchResult, VecGraphError};

/// One queued mutation, paired with the channel its caller is awaiting on.
enum Mutation {
    AddPoint {
        id: NodeId,
        vector: Vec<f32>,
        reply: oneshot::Sender<Result<()>>,
    },
    RemovePoint {
        id: NodeId,
        reply: oneshot::Sender<Result<()>>,
    },
    UpdatePoint {
        id: NodeId,
        vector: Vec<f32>,
        reply: oneshot::Sender<Result<()>>,
    },
    Rebuild {
        reply: oneshot::Sender<Result<()>>,
    },
    ReplaceSnapshot {
        snapshot: Box<Snapshot>,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Serializes writes to a shared [`Graph`] behind a bounded channel and a
/// single background worker.
///
/// Cloning a `MutationQueue` is cheap — the sender half and the shared
/// graph handle are both reference-counted — and every clone feeds the
/// same worker.
#[derive(Clone)]
pub struct MutationQueue {
    graph: Arc<RwLock<Graph>>,
    sender: mpsc::Sender<Mutation>,
}

impl MutationQueue {
    /// Spawns the background worker and returns a handle to it. The
    /// worker runs until every `MutationQueue` clone (and its internal
    /// sender) is dropped.
    pub fn spawn(graph: Graph, channel_capacity: usize) -> (Self, JoinHandle<()>) {
        let graph = Arc::new(RwLock::new(graph));
        let (sender, receiver) = mpsc::channel(channel_capacity);
        let worker_graph = graph.clone();
        let handle = tokio::spawn(Self::run(worker_graph, receiver));
        (Self { graph, sender }, handle)
    }

    #[instrument(skip(graph, receiver))]
    async fn run(graph: Arc<RwLock<Graph>>, mut receiver: mpsc::Receiver<Mutation>) {
        while let Some(mutation) = receiver.recv().await {
            let mut guard = graph.write().await;
            let (result, reply) = match mutation {
                Mutation::AddPoint { id, vector, reply } => {
                    (guard.add_point(id, vector), reply)
                }
                Mutation::RemovePoint { id, reply } => {
                    guard.remove_point(&id);
                    (Ok(()), reply)
                }
                Mutation::UpdatePoint { id, vector, reply } => {
                    (guard.update_point(id, vector), reply)
                }
                Mutation::Rebuild { reply } => {
                    let result = guard.rebuild_from_snapshot(|_progress| {});
                    (result, reply)
                }
                Mutation::ReplaceSnapshot { snapshot, reply } => {
                    *guard = Graph::from_snapshot(*snapshot);
                    (Ok(()), reply)
                }
            };
            drop(guard);
            if reply.send(result).is_err() {
                warn!("mutation caller dropped its reply channel before completion");
            }
        }
    }

    /// Queue an insert and wait for it to apply.
    pub async fn add_point(&self, id: NodeId, vector: Vec<f32>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Mutation::AddPoint { id, vector, reply }).await?;
        rx.await
            .map_err(|_| VecGraphError::QueueFailure("worker dropped reply channel".into()))?
    }

    /// Queue a soft delete and wait for it to apply.
    pub async fn remove_point(&self, id: NodeId) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Mutation::RemovePoint { id, reply }).await?;
        rx.await
            .map_err(|_| VecGraphError::QueueFailure("worker dropped reply channel".into()))?
    }

    /// Queue a tombstone-then-reinsert update and wait for it to apply.
    pub async fn update_point(&self, id: NodeId, vector: Vec<f32>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Mutation::UpdatePoint { id, vector, reply }).await?;
        rx.await
            .map_err(|_| VecGraphError::QueueFailure("worker dropped reply channel".into()))?
    }

    /// Queue an in-place rebuild (tombstone compaction) and wait for it to
    /// complete.
    pub async fn rebuild(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Mutation::Rebuild { reply }).await?;
        rx.await
            .map_err(|_| VecGraphError::QueueFailure("worker dropped reply channel".into()))?
    }

    /// Queue a wholesale replacement of the live graph with a loaded
    /// snapshot.
    pub async fn replace_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Mutation::ReplaceSnapshot {
            snapshot: Box::new(snapshot),
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| VecGraphError::QueueFailure("worker dropped reply channel".into()))?
    }

    async fn send(&self, mutation: Mutation) -> Result<()> {
        self.sender
            .send(mutation)
            .await
            .map_err(|_| VecGraphError::QueueFailure("mutation worker is no longer running".into()))
    }

    /// Top-K search against whatever state is currently committed. Bypasses
    /// the queue entirely — readers never wait on pending writes beyond the
    /// duration of a single write-lock hold.
    pub async fn search_knn(&self, query: &[f32], params: SearchParams) -> Result<Vec<SearchResult>> {
        let guard = self.graph.read().await;
        guard.search_knn(query, &params)
    }

    /// Snapshot the current live graph for persistence (spec.md §4.E).
    pub async fn to_snapshot(&self) -> Snapshot {
        let guard = self.graph.read().await;
        guard.to_snapshot()
    }

    pub async fn len(&self) -> usize {
        self.graph.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.graph.read().await.is_empty()
    }
}

/// A mutation description that can cross an address space boundary, for
/// the "background executor offload" shape in spec.md §4.F: instead of
/// applying a mutation in-process, hand the current snapshot and the
/// mutation to an external [`MutationExecutor`] and adopt whatever
/// snapshot it returns.
#[derive(Debug, Clone)]
pub enum GraphMutation {
    AddPoint { id: NodeId, vector: Vec<f32> },
    RemovePoint { id: NodeId },
    UpdatePoint { id: NodeId, vector: Vec<f32> },
    Rebuild,
}

/// Applies a [`GraphMutation`] to a snapshot and returns the resulting
/// snapshot, without assuming the work happens in this process.
#[async_trait]
pub trait MutationExecutor: Send + Sync {
    async fn execute(&self, snapshot: Snapshot, mutation: GraphMutation) -> Result<Snapshot>;
}

/// Default [`MutationExecutor`]: deserializes, mutates, reserializes in
/// the calling task. Suitable when there is no separate worker pool to
/// offload to.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

#[async_trait]
impl MutationExecutor for InlineExecutor {
    async fn execute(&self, snapshot: Snapshot, mutation: GraphMutation) -> Result<Snapshot> {
        let mut graph = Graph::from_snapshot(snapshot);
        match mutation {
            GraphMutation::AddPoint { id, vector } => graph.add_point(id, vector)?,
            GraphMutation::RemovePoint { id } => graph.remove_point(&id),
            GraphMutation::UpdatePoint { id, vector } => graph.update_point(id, vector)?,
            GraphMutation::Rebuild => graph.rebuild_from_snapshot(|_| {})?,
        }
        Ok(graph.to_snapshot())
    }
}
