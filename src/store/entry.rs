//! Stored representation of a single cache entry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Process-wide insertion counter.
///
/// Oldest-insertion eviction orders entries by this sequence rather than by
/// wall-clock timestamp, so two inserts landing in the same millisecond
/// still evict deterministically.
static INSERT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One cache entry as held by every backend.
///
/// The payload is kept as a JSON value; callers serialize on `set` and
/// deserialize on `get`, so a single entry type serves the in-memory maps
/// and the durable on-disk format alike.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredEntry {
    pub created_at_ms: u64,
    pub ttl_ms: u64,
    #[serde(default)]
    pub seq: u64,
    pub payload: Value,
}

impl StoredEntry {
    /// Create an entry stamped with the current time and the next
    /// insertion sequence.
    pub fn new(payload: Value, ttl: Duration) -> Self {
        StoredEntry {
            created_at_ms: now_ms(),
            ttl_ms: ttl.as_millis() as u64,
            seq: INSERT_SEQ.fetch_add(1, Ordering::Relaxed),
            payload,
        }
    }

    /// An entry is expired strictly after its TTL has elapsed.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > self.ttl_ms
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expiry_boundary() {
        let entry = StoredEntry::new(json!(1), Duration::from_millis(100));
        let created = entry.created_at_ms;

        // Alive at and before the boundary, expired strictly after.
        assert!(!entry.is_expired_at(created));
        assert!(!entry.is_expired_at(created + 100));
        assert!(entry.is_expired_at(created + 101));
    }

    #[test]
    fn test_insertion_sequence_is_monotonic() {
        let a = StoredEntry::new(json!("a"), Duration::from_secs(1));
        let b = StoredEntry::new(json!("b"), Duration::from_secs(1));
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_roundtrip_through_json() {
        let entry = StoredEntry::new(json!({"id": "p1"}), Duration::from_secs(60));
        let bytes = serde_json::to_vec(&entry).expect("Failed to serialize");
        let parsed: StoredEntry = serde_json::from_slice(&bytes).expect("Failed to deserialize");
        assert_eq!(parsed.created_at_ms, entry.created_at_ms);
        assert_eq!(parsed.ttl_ms, entry.ttl_ms);
        assert_eq!(parsed.payload, entry.payload);
    }
}
