use crate::{Error, Result, SnapshotStore};
use async_trait::async_trait;
use rocksdb::{Options, DB};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration for a [`RocksSnapshotStore`].
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Create the underlying RocksDB database if it does not already exist.
    pub create_if_missing: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
        }
    }
}

/// A [`SnapshotStore`] backed by a RocksDB database, one per index name.
pub struct RocksSnapshotStore {
    db: DB,
    path: PathBuf,
    name: String,
}

impl RocksSnapshotStore {
    /// Open (creating if necessary) the store for index `name` under `root`.
    pub fn open(root: impl AsRef<Path>, name: &str) -> Result<Self> {
        Self::open_with_config(root, name, StorageConfig::default())
    }

    pub fn open_with_config(root: impl AsRef<Path>, name: &str, config: StorageConfig) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::Unavailable("index name must not be empty".into()));
        }
        let path = root.as_ref().join(name);
        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        let db = DB::open(&opts, &path)?;
        info!(index = name, path = %path.display(), "opened snapshot store");
        Ok(Self {
            db,
            path,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for RocksSnapshotStore {
    async fn put_blob(&self, key: &str, blob: Vec<u8>) -> Result<()> {
        debug!(index = %self.name, key, bytes = blob.len(), "put_blob");
        self.db.put(key.as_bytes(), &blob)?;
        Ok(())
    }

    async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        debug!(index = %self.name, key, "get_blob");
        Ok(self.db.get(key.as_bytes())?)
    }

    async fn drop_store(self) -> Result<()> {
        let path = self.path.clone();
        let name = self.name.clone();
        drop(self.db);
        DB::destroy(&Options::default(), &path)?;
        info!(index = %name, "dropped snapshot store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PRIMARY_KEY;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksSnapshotStore::open(dir.path(), "idx-a").unwrap();

        assert!(store.get_blob(PRIMARY_KEY).await.unwrap().is_none());

        store
            .put_blob(PRIMARY_KEY, b"snapshot-bytes".to_vec())
            .await
            .unwrap();

        let got = store.get_blob(PRIMARY_KEY).await.unwrap().unwrap();
        assert_eq!(got, b"snapshot-bytes");
    }

    #[tokio::test]
    async fn overwrite_replaces_previous_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksSnapshotStore::open(dir.path(), "idx-b").unwrap();

        store.put_blob(PRIMARY_KEY, b"v1".to_vec()).await.unwrap();
        store.put_blob(PRIMARY_KEY, b"v2".to_vec()).await.unwrap();

        assert_eq!(
            store.get_blob(PRIMARY_KEY).await.unwrap().unwrap(),
            b"v2".to_vec()
        );
    }

    #[tokio::test]
    async fn drop_store_removes_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksSnapshotStore::open(dir.path(), "idx-c").unwrap();
        store.put_blob(PRIMARY_KEY, b"bytes".to_vec()).await.unwrap();
        let path = store.path().to_path_buf();

        store.drop_store().await.unwrap();

        assert!(!path.join("CURRENT").exists());
    }

    #[test]
    fn rejects_empty_index_name() {
        let dir = tempfile::tempdir().unwrap();
        let result = RocksSnapshotStore::open(dir.path(), "");
        assert!(result.is_err());
    }
}
