//! Blob-store adapter used to persist a single opaque index snapshot.
//!
//! This crate is the "external collaborator" named in the graph engine's
//! design: it knows nothing about HNSW, nodes, or vectors. It stores and
//! retrieves byte blobs keyed by a small string key, one RocksDB database
//! per index name, with a single reserved key holding the current snapshot.

mod engine;

pub use engine::{RocksSnapshotStore, StorageConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Reserved key under which the current index snapshot is stored.
pub const PRIMARY_KEY: &str = "primary";

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Contract for a persistent store holding one opaque blob per key, scoped
/// to a single logical index. Implementations must not be touched by more
/// than one owner concurrently (§5 of the spec: the serializer owner is the
/// sole caller).
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Store `blob` under `key`, overwriting any previous value.
    async fn put_blob(&self, key: &str, blob: Vec<u8>) -> Result<()>;

    /// Retrieve the blob stored under `key`, or `None` if absent.
    async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Irrecoverably remove the entire store backing this index.
    async fn drop_store(self) -> Result<()>;
}
