//! In-process cache backend.

use super::backend::StoreBackend;
use super::entry::StoredEntry;
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory backend over a concurrent map.
///
/// Serves both the volatile and the session namespaces; the volatile
/// instance carries an entry ceiling, the session instance is unbounded
/// and relies on the TTL sweep alone.
#[derive(Clone)]
pub struct MemoryBackend {
    entries: Arc<DashMap<String, StoredEntry>>,
    max_entries: Option<usize>,
}

impl MemoryBackend {
    /// Unbounded backend (session namespace).
    pub fn new() -> Self {
        MemoryBackend {
            entries: Arc::new(DashMap::new()),
            max_entries: None,
        }
    }

    /// Backend with an entry ceiling (volatile namespace).
    ///
    /// When an insert pushes the count past the ceiling, the single entry
    /// with the oldest insertion sequence is removed. Oldest-insertion,
    /// not least-recently-used: reads do not refresh an entry's position.
    pub fn bounded(max_entries: usize) -> Self {
        MemoryBackend {
            entries: Arc::new(DashMap::new()),
            max_entries: Some(max_entries),
        }
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|kv| kv.value().seq)
            .map(|kv| kv.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!("✓ evicted oldest entry {} (ceiling reached)", key);
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        Ok(self.entries.get(key).map(|kv| kv.value().clone()))
    }

    async fn set(&self, key: &str, entry: StoredEntry) -> Result<()> {
        self.entries.insert(key.to_string(), entry);

        if let Some(ceiling) = self.max_entries {
            while self.entries.len() > ceiling {
                self.evict_oldest();
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    async fn len(&self) -> usize {
        self.entries.len()
    }

    async fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|kv| kv.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn entry(value: i64) -> StoredEntry {
        StoredEntry::new(json!(value), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = MemoryBackend::new();
        backend.set("a", entry(1)).await.expect("Failed to set");

        let got = backend.get("a").await.expect("Failed to get");
        assert_eq!(got.expect("Entry missing").payload, json!(1));

        backend.delete("a").await.expect("Failed to delete");
        assert!(backend.get("a").await.expect("Failed to get").is_none());
    }

    #[tokio::test]
    async fn test_ceiling_evicts_oldest_insertion() {
        let backend = MemoryBackend::bounded(3);
        backend.set("a", entry(1)).await.expect("Failed to set");
        backend.set("b", entry(2)).await.expect("Failed to set");
        backend.set("c", entry(3)).await.expect("Failed to set");

        // Fourth insert pushes past the ceiling; "a" is the oldest.
        backend.set("d", entry(4)).await.expect("Failed to set");

        assert_eq!(backend.len().await, 3);
        assert!(backend.get("a").await.expect("Failed to get").is_none());
        for key in ["b", "c", "d"] {
            assert!(
                backend.get(key).await.expect("Failed to get").is_some(),
                "expected {} to survive eviction",
                key
            );
        }
    }

    #[tokio::test]
    async fn test_overwrite_does_not_grow() {
        let backend = MemoryBackend::bounded(2);
        backend.set("a", entry(1)).await.expect("Failed to set");
        backend.set("a", entry(2)).await.expect("Failed to set");
        assert_eq!(backend.len().await, 1);

        let got = backend.get("a").await.expect("Failed to get");
        assert_eq!(got.expect("Entry missing").payload, json!(2));
    }

    #[tokio::test]
    async fn test_clear() {
        let backend = MemoryBackend::new();
        backend.set("a", entry(1)).await.expect("Failed to set");
        backend.set("b", entry(2)).await.expect("Failed to set");
        backend.clear().await.expect("Failed to clear");
        assert_eq!(backend.len().await, 0);
    }
}
