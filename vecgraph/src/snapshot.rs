//! Snapshot blob schema (spec.md §6) and encode/decode helpers.
//!
//! Field names are fixed to the wire schema given in the spec for
//! cross-implementation interop, even where they diverge from Rust's
//! snake_case convention — hence the `serde(rename = ...)` attributes
//! throughout.

use serde::{Deserialize, Serialize};

use crate::distance::Metric;
use crate::node::NodeId;
use crate::types::{Result, VecGraphError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub uniqueid: NodeId,
    pub level: usize,
    pub vector: Vec<f32>,
    pub neighbors: Vec<Vec<NodeId>>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "M")]
    pub m: usize,
    /// Extension beyond the logical schema in spec.md §6 (level-0 degree
    /// cap, spec.md §9's open question); defaults to `m` on older blobs
    /// that predate the field.
    #[serde(rename = "Mmax0", default)]
    pub mmax0: usize,
    #[serde(rename = "efConstruction")]
    pub ef_construction: usize,
    #[serde(rename = "levelMax")]
    pub level_max: usize,
    #[serde(rename = "entryPointId")]
    pub entry_point_id: NodeId,
    /// Extension beyond the logical schema: needed to reconstruct the
    /// similarity function on load (spec.md §4.D: "The similarity function
    /// ... [is] reconstructed from M and the metric tag").
    pub metric: Metric,
    pub nodes: Vec<(NodeId, SnapshotNode)>,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| VecGraphError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| VecGraphError::Serialization(e.to_string()))
    }
}
