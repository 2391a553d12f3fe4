//! Expiring key/value cache across three independent backends.
//!
//! The store owns a volatile in-process map (capacity-bounded), a durable
//! file-backed map (surviving restarts), and a session-scoped in-process
//! map (cleared on shutdown). Each backend is its own namespace; nothing
//! is shared or reconciled between them.
//!
//! Expiry is enforced twice: lazily on every read (an expired entry is
//! deleted as a side effect of the `get` that found it), and by a periodic
//! sweep task that bounds growth from keys that are written but never read
//! again.
//!
//! Storage failures never reach the caller. A durable write that fails is
//! redirected to the volatile backend; an entry that fails to decode is
//! treated as absent and purged.

pub mod backend;
pub mod durable;
pub mod entry;
pub mod memory;

pub use backend::{Backend, StoreBackend};
pub use durable::DurableBackend;
pub use entry::StoredEntry;
pub use memory::MemoryBackend;

use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration for [`CacheStore`].
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Prefix applied to durable file names, so the cache can share a
    /// directory with unrelated data.
    pub namespace: String,
    /// Entry ceiling for the volatile backend.
    pub max_entries: usize,
    /// Interval between background expiry sweeps.
    pub sweep_interval: Duration,
    /// TTL applied when a `set` does not specify one.
    pub default_ttl: Duration,
    /// Directory holding durable entries.
    pub durable_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            namespace: "fetchkit-".to_string(),
            max_entries: 200,
            sweep_interval: Duration::from_secs(60),
            default_ttl: Duration::from_secs(3600),
            durable_dir: std::env::temp_dir().join("fetch-kit"),
        }
    }
}

/// Per-call options for [`CacheStore::set`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SetOptions {
    /// Entry lifetime; the store default applies when `None` (or zero).
    pub ttl: Option<Duration>,
    pub backend: Option<Backend>,
}

impl SetOptions {
    pub fn ttl(ttl: Duration) -> Self {
        SetOptions {
            ttl: Some(ttl),
            backend: None,
        }
    }

    pub fn backend(backend: Backend) -> Self {
        SetOptions {
            ttl: None,
            backend: Some(backend),
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }
}

/// Read-only snapshot of store state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub volatile_entries: usize,
    pub durable_entries: usize,
    pub session_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Multi-backend expiring cache.
///
/// # Example
///
/// ```ignore
/// use fetch_kit::store::{Backend, CacheStore, SetOptions, StoreConfig};
/// use std::time::Duration;
///
/// let store = CacheStore::new(StoreConfig::default());
/// store.set("photos:page:1", &page, SetOptions::ttl(Duration::from_secs(300))).await;
/// let cached: Option<PhotosPage> = store.get("photos:page:1", Backend::Volatile).await;
/// store.shutdown().await;
/// ```
pub struct CacheStore {
    volatile: MemoryBackend,
    durable: DurableBackend,
    session: MemoryBackend,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CacheStore {
    /// Create a store and start its background sweep.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: StoreConfig) -> Self {
        let volatile = MemoryBackend::bounded(config.max_entries);
        let durable = DurableBackend::new(config.durable_dir.clone(), config.namespace.clone());
        let session = MemoryBackend::new();

        let sweeper = Self::spawn_sweeper(
            volatile.clone(),
            durable.clone(),
            session.clone(),
            config.sweep_interval,
        );

        info!(
            "✓ cache store initialized (ceiling: {}, sweep: {:?}, dir: {})",
            config.max_entries,
            config.sweep_interval,
            config.durable_dir.display()
        );

        CacheStore {
            volatile,
            durable,
            session,
            default_ttl: config.default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    fn spawn_sweeper(
        volatile: MemoryBackend,
        durable: DurableBackend,
        session: MemoryBackend,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh store
            // does not sweep before anything is written.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = sweep_backend(&volatile).await
                    + sweep_backend(&durable).await
                    + sweep_backend(&session).await;
                if removed > 0 {
                    debug!("✓ sweep removed {} expired entries", removed);
                }
            }
        })
    }

    /// Write an entry.
    ///
    /// Never fails from the caller's point of view: a durable write error
    /// falls back to the volatile backend, and a payload that cannot be
    /// serialized is dropped with a log line.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, opts: SetOptions) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("⚠ cache SET {} dropped: {}", key, e);
                return;
            }
        };

        let ttl = match opts.ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => self.default_ttl,
        };
        let target = opts.backend.unwrap_or(Backend::Volatile);
        let entry = StoredEntry::new(payload, ttl);

        match target {
            Backend::Volatile => {
                let _ = self.volatile.set(key, entry).await;
            }
            Backend::Session => {
                let _ = self.session.set(key, entry).await;
            }
            Backend::Durable => {
                if let Err(e) = self.durable.set(key, entry.clone()).await {
                    warn!("⚠ durable SET {} failed ({}), falling back to volatile", key, e);
                    let _ = self.volatile.set(key, entry).await;
                }
            }
        }
        debug!("✓ cache SET {} (backend: {}, ttl: {:?})", key, target, ttl);
    }

    /// Read an entry, enforcing expiry lazily.
    ///
    /// Returns `None` when the key is absent, expired (the entry is
    /// deleted as a side effect), or undecodable (the entry is purged).
    pub async fn get<T: DeserializeOwned>(&self, key: &str, backend: Backend) -> Option<T> {
        let entry = match self.raw_get(key, backend).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return self.miss(key, backend),
            Err(Error::DeserializationError(e)) => {
                warn!("⚠ purging corrupt entry {}: {}", key, e);
                self.delete(key, backend).await;
                return self.miss(key, backend);
            }
            Err(e) => {
                warn!("⚠ cache GET {} failed: {}", key, e);
                return self.miss(key, backend);
            }
        };

        if entry.is_expired() {
            debug!("✗ cache GET {} -> expired (lazy eviction)", key);
            self.delete(key, backend).await;
            return self.miss(key, backend);
        }

        match serde_json::from_value(entry.payload) {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("✓ cache GET {} -> HIT ({})", key, backend);
                Some(value)
            }
            Err(e) => {
                warn!("⚠ purging undecodable entry {}: {}", key, e);
                self.delete(key, backend).await;
                self.miss(key, backend)
            }
        }
    }

    fn miss<T>(&self, key: &str, backend: Backend) -> Option<T> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("✗ cache GET {} -> MISS ({})", key, backend);
        None
    }

    async fn raw_get(&self, key: &str, backend: Backend) -> crate::error::Result<Option<StoredEntry>> {
        match backend {
            Backend::Volatile => self.volatile.get(key).await,
            Backend::Durable => self.durable.get(key).await,
            Backend::Session => self.session.get(key).await,
        }
    }

    /// Remove one entry. Best effort.
    pub async fn delete(&self, key: &str, backend: Backend) {
        let _ = match backend {
            Backend::Volatile => self.volatile.delete(key).await,
            Backend::Durable => self.durable.delete(key).await,
            Backend::Session => self.session.delete(key).await,
        };
    }

    /// Remove every entry whose key starts with `prefix`.
    ///
    /// The list-view invalidation primitive: after a mutation, drop every
    /// cached page of the affected collection in one call.
    pub async fn invalidate_prefix(&self, prefix: &str, backend: Backend) -> usize {
        let keys = match backend {
            Backend::Volatile => self.volatile.keys().await,
            Backend::Durable => self.durable.keys().await,
            Backend::Session => self.session.keys().await,
        };

        let mut removed = 0;
        for key in keys {
            if key.starts_with(prefix) {
                self.delete(&key, backend).await;
                removed += 1;
            }
        }
        debug!("✓ invalidated {} entries under {} ({})", removed, prefix, backend);
        removed
    }

    /// Remove all entries in one backend, or in all three.
    pub async fn clear(&self, backend: Option<Backend>) {
        match backend {
            Some(Backend::Volatile) => {
                let _ = self.volatile.clear().await;
            }
            Some(Backend::Durable) => {
                let _ = self.durable.clear().await;
            }
            Some(Backend::Session) => {
                let _ = self.session.clear().await;
            }
            None => {
                let _ = self.volatile.clear().await;
                let _ = self.durable.clear().await;
                let _ = self.session.clear().await;
            }
        }
    }

    pub async fn size(&self, backend: Backend) -> usize {
        match backend {
            Backend::Volatile => self.volatile.len().await,
            Backend::Durable => self.durable.len().await,
            Backend::Session => self.session.len().await,
        }
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            volatile_entries: self.volatile.len().await,
            durable_entries: self.durable.len().await,
            session_entries: self.session.len().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Stop the sweep and clear all backends. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().ok().and_then(|mut s| s.take()) {
            handle.abort();
            debug!("✓ cache sweep stopped");
        }
        self.clear(None).await;
    }
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().ok().and_then(|mut s| s.take()) {
            handle.abort();
        }
    }
}

/// Remove every expired entry from one backend, treating entries that fail
/// to decode as expired.
async fn sweep_backend<B: StoreBackend>(backend: &B) -> usize {
    let mut removed = 0;
    for key in backend.keys().await {
        match backend.get(&key).await {
            Ok(Some(entry)) if entry.is_expired() => {
                let _ = backend.delete(&key).await;
                removed += 1;
            }
            Err(_) => {
                let _ = backend.delete(&key).await;
                removed += 1;
            }
            _ => {}
        }
    }
    removed
}
