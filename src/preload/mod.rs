//! Bounded-concurrency asset preloader.
//!
//! Keys move through a FIFO queue into a bounded active set; the drain
//! step runs after every `schedule` call and after every settlement, so
//! the active set refills as soon as a slot frees up. Outcomes are
//! recorded per key and never raised: a failed warm-up is a status, not
//! an error.
//!
//! A key is tracked from the moment it is scheduled until the preloader
//! is dropped: scheduling a key that is queued, active, or already
//! settled is a no-op. The same key is never fetched twice concurrently,
//! and a completed key is never re-fetched by `schedule` alone.

use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Load-discipline hint passed to the fetcher. Does not bypass the
/// concurrency bound or FIFO order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    High,
    Low,
}

/// Lifecycle of one scheduled key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreloadStatus {
    Queued,
    Active,
    Done,
    Error,
}

/// The underlying asset load (image decode, byte fetch). Implementations
/// capture whatever client or decoder they need.
pub trait AssetFetcher: Send + Sync + 'static {
    fn fetch(&self, key: &str, priority: Priority) -> BoxFuture<'static, crate::Result<()>>;
}

/// Configuration for [`Preloader`].
#[derive(Clone, Copy, Debug)]
pub struct PreloaderConfig {
    /// Ceiling on simultaneously in-flight fetches.
    pub max_concurrent: usize,
    pub priority: Priority,
}

impl Default for PreloaderConfig {
    fn default() -> Self {
        PreloaderConfig {
            max_concurrent: 3,
            priority: Priority::Low,
        }
    }
}

#[derive(Default)]
struct PreloadState {
    queue: VecDeque<String>,
    active: HashSet<String>,
    status: HashMap<String, PreloadStatus>,
}

struct Inner {
    fetcher: Arc<dyn AssetFetcher>,
    max_concurrent: usize,
    priority: Priority,
    state: Mutex<PreloadState>,
}

/// FIFO preloader with a fixed number of in-flight slots.
///
/// Fetches run as spawned tasks, so `schedule` must be called from within
/// a tokio runtime.
///
/// # Example
///
/// ```ignore
/// use fetch_kit::preload::{Preloader, PreloaderConfig};
///
/// let preloader = Preloader::new(fetcher, PreloaderConfig::default());
/// preloader.schedule(photo_urls);
/// ```
#[derive(Clone)]
pub struct Preloader {
    inner: Arc<Inner>,
}

impl Preloader {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, config: PreloaderConfig) -> Self {
        Preloader {
            inner: Arc::new(Inner {
                fetcher,
                max_concurrent: config.max_concurrent.max(1),
                priority: config.priority,
                state: Mutex::new(PreloadState::default()),
            }),
        }
    }

    /// Enqueue every key not already tracked, then drain.
    pub fn schedule<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.inner.state.lock().expect("preload state poisoned");
            for key in keys {
                let key = key.into();
                if state.status.contains_key(&key) {
                    debug!("preload skip {} (already tracked)", key);
                    continue;
                }
                state.status.insert(key.clone(), PreloadStatus::Queued);
                state.queue.push_back(key);
            }
        }
        Inner::drain(&self.inner);
    }

    pub fn status(&self, key: &str) -> Option<PreloadStatus> {
        self.inner
            .state
            .lock()
            .expect("preload state poisoned")
            .status
            .get(key)
            .copied()
    }

    /// True while anything is queued or in flight.
    pub fn is_loading(&self) -> bool {
        let state = self.inner.state.lock().expect("preload state poisoned");
        !state.queue.is_empty() || !state.active.is_empty()
    }

    /// Number of keys currently in flight. Never exceeds `max_concurrent`.
    pub fn active_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .expect("preload state poisoned")
            .active
            .len()
    }
}

impl Inner {
    /// Move keys from the queue into free slots. Each queue-pop and
    /// active-insert happens in one critical section, so a key is never
    /// observable in both sets.
    fn drain(inner: &Arc<Inner>) {
        loop {
            let key = {
                let mut state = inner.state.lock().expect("preload state poisoned");
                if state.active.len() >= inner.max_concurrent {
                    return;
                }
                let Some(key) = state.queue.pop_front() else {
                    return;
                };
                state.active.insert(key.clone());
                state.status.insert(key.clone(), PreloadStatus::Active);
                key
            };

            debug!("» preload {} started", key);
            let task_inner = Arc::clone(inner);
            tokio::spawn(async move {
                let result = task_inner.fetcher.fetch(&key, task_inner.priority).await;
                {
                    let mut state = task_inner.state.lock().expect("preload state poisoned");
                    state.active.remove(&key);
                    match &result {
                        Ok(()) => {
                            state.status.insert(key.clone(), PreloadStatus::Done);
                        }
                        Err(e) => {
                            state.status.insert(key.clone(), PreloadStatus::Error);
                            warn!("⚠ preload {} failed: {}", key, e);
                        }
                    }
                }
                if result.is_ok() {
                    debug!("✓ preload {} done", key);
                }
                Inner::drain(&task_inner);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Semaphore;

    /// Fetcher that parks every fetch until the test releases a permit.
    struct GatedFetcher {
        gate: Arc<Semaphore>,
        fetches: AtomicU32,
        fail_keys: Vec<String>,
    }

    impl GatedFetcher {
        fn new(gate: Arc<Semaphore>) -> Self {
            GatedFetcher {
                gate,
                fetches: AtomicU32::new(0),
                fail_keys: Vec::new(),
            }
        }
    }

    impl AssetFetcher for GatedFetcher {
        fn fetch(&self, key: &str, _priority: Priority) -> BoxFuture<'static, crate::Result<()>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let gate = Arc::clone(&self.gate);
            let fail = self.fail_keys.contains(&key.to_string());
            let key = key.to_string();
            Box::pin(async move {
                gate.acquire().await.expect("gate closed").forget();
                if fail {
                    Err(Error::ServerError {
                        status: None,
                        message: format!("decode failed for {}", key),
                    })
                } else {
                    Ok(())
                }
            })
        }
    }

    /// Let spawned drain tasks run up to their suspension points.
    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrency_bound_holds_mid_drain() {
        let gate = Arc::new(Semaphore::new(0));
        let fetcher = Arc::new(GatedFetcher::new(Arc::clone(&gate)));
        let preloader = Preloader::new(
            fetcher.clone(),
            PreloaderConfig {
                max_concurrent: 3,
                priority: Priority::Low,
            },
        );

        preloader.schedule((0..10).map(|i| format!("asset-{}", i)));
        settle().await;

        // Sampled mid-drain: exactly the first three are active.
        assert_eq!(preloader.active_count(), 3);
        assert_eq!(preloader.status("asset-0"), Some(PreloadStatus::Active));
        assert_eq!(preloader.status("asset-3"), Some(PreloadStatus::Queued));
        assert!(preloader.is_loading());

        // Release one; the next queued key takes the freed slot.
        gate.add_permits(1);
        settle().await;
        assert_eq!(preloader.active_count(), 3);
        assert_eq!(preloader.status("asset-0"), Some(PreloadStatus::Done));
        assert_eq!(preloader.status("asset-3"), Some(PreloadStatus::Active));

        gate.add_permits(100);
        settle().await;
        assert!(!preloader.is_loading());
        for i in 0..10 {
            assert_eq!(
                preloader.status(&format!("asset-{}", i)),
                Some(PreloadStatus::Done)
            );
        }
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_scheduling_same_key_twice_fetches_once() {
        let gate = Arc::new(Semaphore::new(0));
        let fetcher = Arc::new(GatedFetcher::new(Arc::clone(&gate)));
        let preloader = Preloader::new(fetcher.clone(), PreloaderConfig::default());

        preloader.schedule(["asset-1"]);
        settle().await;
        // Still in flight; rescheduling is a no-op.
        preloader.schedule(["asset-1"]);
        gate.add_permits(10);
        settle().await;

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);

        // Settled keys are not re-fetched either.
        preloader.schedule(["asset-1"]);
        settle().await;
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_not_raised() {
        let gate = Arc::new(Semaphore::new(10));
        let fetcher = Arc::new(GatedFetcher {
            gate,
            fetches: AtomicU32::new(0),
            fail_keys: vec!["broken".to_string()],
        });
        let preloader = Preloader::new(fetcher, PreloaderConfig::default());

        preloader.schedule(["ok", "broken"]);
        settle().await;

        assert_eq!(preloader.status("ok"), Some(PreloadStatus::Done));
        assert_eq!(preloader.status("broken"), Some(PreloadStatus::Error));
        assert!(!preloader.is_loading());
    }

    #[tokio::test]
    async fn test_untracked_key_has_no_status() {
        let gate = Arc::new(Semaphore::new(0));
        let preloader = Preloader::new(
            Arc::new(GatedFetcher::new(gate)),
            PreloaderConfig::default(),
        );
        assert_eq!(preloader.status("never-scheduled"), None);
        assert!(!preloader.is_loading());
    }
}
