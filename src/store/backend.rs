//! Storage backend abstraction shared by the three cache namespaces.

use super::entry::StoredEntry;
use crate::error::Result;

/// Which of the three independent cache namespaces an operation targets.
///
/// Backends are fully independent: the same key may hold different values
/// in different backends at the same time, and no cross-backend
/// consistency is attempted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    /// In-process map, bounded by the configured entry ceiling.
    Volatile,
    /// File-backed store surviving process restarts. Best effort: write
    /// failures redirect the entry to the volatile backend.
    Durable,
    /// In-process map scoped to the store's lifetime, cleared on shutdown.
    Session,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Volatile => write!(f, "volatile"),
            Backend::Durable => write!(f, "durable"),
            Backend::Session => write!(f, "session"),
        }
    }
}

/// Operations every cache backend must support.
pub trait StoreBackend {
    /// Fetch the raw entry for `key`, without expiry interpretation.
    ///
    /// `Err(Error::DeserializationError)` marks a corrupt entry the caller
    /// should purge.
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>>;

    async fn set(&self, key: &str, entry: StoredEntry) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    async fn len(&self) -> usize;

    /// Every key currently present, expired or not.
    async fn keys(&self) -> Vec<String>;
}
