//! File-backed cache backend.

use super::backend::StoreBackend;
use super::entry::StoredEntry;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Durable backend writing one JSON file per entry.
///
/// Every file name carries the configured namespace prefix, so the backend
/// can share a directory with unrelated data without colliding with it or
/// clearing it. Keys are hex-encoded into the file name, which keeps
/// arbitrary key strings filesystem-safe and reversible.
///
/// All operations are best effort: the store recovers from write failures
/// by redirecting the entry to the volatile backend, and ignores failed
/// deletes.
#[derive(Clone)]
pub struct DurableBackend {
    dir: PathBuf,
    namespace: String,
}

impl DurableBackend {
    pub fn new(dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        DurableBackend {
            dir: dir.into(),
            namespace: namespace.into(),
        }
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}.json", self.namespace, hex::encode(key)))
    }

    /// Recover the original key from a file name, if the file belongs to
    /// this namespace.
    fn key_from_file(&self, name: &str) -> Option<String> {
        let encoded = name
            .strip_prefix(&self.namespace)?
            .strip_suffix(".json")?;
        let bytes = hex::decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }

    async fn remove_file(path: &Path) {
        let _ = tokio::fs::remove_file(path).await;
    }
}

impl StoreBackend for DurableBackend {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        let path = self.file_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::BackendError(format!(
                    "durable read failed for {}: {}",
                    key, e
                )))
            }
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            Error::DeserializationError(format!("corrupt durable entry for {}: {}", key, e))
        })
    }

    async fn set(&self, key: &str, entry: StoredEntry) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::BackendError(format!(
                "durable directory {} unavailable: {}",
                self.dir.display(),
                e
            ))
        })?;

        let bytes = serde_json::to_vec(&entry)
            .map_err(|e| Error::SerializationError(format!("durable entry for {}: {}", key, e)))?;

        // Temp file + rename, so a crash mid-write never leaves a
        // half-written entry behind.
        let path = self.file_path(key);
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            Error::BackendError(format!("durable write failed for {}: {}", key, e))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            Error::BackendError(format!("durable rename failed for {}: {}", key, e))
        })?;

        debug!("✓ durable SET {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        Self::remove_file(&self.file_path(key)).await;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        for key in StoreBackend::keys(self).await {
            Self::remove_file(&self.file_path(&key)).await;
        }
        Ok(())
    }

    async fn len(&self) -> usize {
        StoreBackend::keys(self).await.len()
    }

    async fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        let Ok(mut dir) = tokio::fs::read_dir(&self.dir).await else {
            return keys;
        };
        while let Ok(Some(file)) = dir.next_entry().await {
            let name = file.file_name();
            if let Some(key) = name.to_str().and_then(|n| self.key_from_file(n)) {
                keys.push(key);
            }
        }
        keys
    }
}
