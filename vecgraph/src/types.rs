//! Shared types: errors, search results, and the closed configuration set.

use crate::distance::Metric;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum VecGraphError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    #[error("snapshot missing for index {0}")]
    SnapshotMissing(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("queue operation failed: {0}")]
    QueueFailure(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(#[from] vecgraph_storage::Error),
}

pub type Result<T> = std::result::Result<T, VecGraphError>;

/// Configuration for an [`crate::graph::Graph`]. `M` bounds per-level
/// degree above layer 0; `mmax0` bounds degree at layer 0 and defaults to
/// `M` (spec.md's open question on level-0 degree resolves to a
/// configurable `Mmax0`, default `M`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub m: usize,
    pub mmax0: usize,
    pub ef_construction: usize,
    pub metric: Metric,
}

impl GraphConfig {
    pub fn new(m: usize, metric: Metric) -> Self {
        Self {
            m,
            mmax0: m,
            ef_construction: 200,
            metric,
        }
    }

    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    pub fn with_mmax0(mut self, mmax0: usize) -> Self {
        self.mmax0 = mmax0;
        self
    }

    /// Degree bound for `level`: `mmax0` at layer 0, `m` elsewhere.
    pub fn max_degree(&self, level: usize) -> usize {
        if level == 0 {
            self.mmax0
        } else {
            self.m
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::new(16, Metric::Cosine)
    }
}

/// Parameters for a top-K search. Defaults match spec.md §6.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub k: usize,
    /// Similarity floor; results must score strictly greater than this.
    pub tau: f32,
    pub ef: Option<usize>,
    pub beam_size: usize,
}

impl SearchParams {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            tau: 0.5,
            ef: None,
            beam_size: 10,
        }
    }

    pub fn with_tau(mut self, tau: f32) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_ef(mut self, ef: usize) -> Self {
        self.ef = Some(ef);
        self
    }

    pub fn with_beam_size(mut self, beam_size: usize) -> Self {
        self.beam_size = beam_size;
        self
    }
}

/// One scored hit returned from a top-K search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: NodeId,
    pub vector: Vec<f32>,
    pub score: f32,
}
