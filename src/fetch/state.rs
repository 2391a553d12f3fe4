//! Generic fetch-state machine with a stale-result guard.

use crate::error::Result;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Observable state of one fetched resource.
///
/// After settling, exactly one terminal condition holds: data present with
/// no error, or an error with no data. While a load is in flight,
/// `loading` is true and the previous `data` stays readable for consumers
/// rendering stale content during revalidation.
#[derive(Clone, Debug)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Drives `idle → loading → (success | error)` over an injected fetch.
///
/// Completions are not ordered: a slow attempt may settle after a newer
/// one has already started. Every `load` takes a fresh generation number
/// and commits its result only if no newer load has begun since; a stale
/// settlement is discarded rather than allowed to clobber newer state.
///
/// `load` never propagates an `Err` past its boundary; failures settle
/// into `error: Some(message)`.
///
/// # Example
///
/// ```ignore
/// let controller = FetchController::new();
/// controller.load(|| client.photo::<Photo>("p1")).await;
/// if let Some(photo) = controller.data() { render(photo); }
/// ```
pub struct FetchController<T> {
    state: Mutex<FetchState<T>>,
    generation: AtomicU64,
}

impl<T: Clone> FetchController<T> {
    pub fn new() -> Self {
        FetchController {
            state: Mutex::new(FetchState::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Run one fetch attempt. Call again to refetch, or whenever the
    /// dependency key the fetch closes over has changed.
    pub async fn load<F, Fut>(&self, fetch: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock().expect("fetch state poisoned");
            state.loading = true;
            state.error = None;
        }

        let result = fetch().await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("✗ discarding stale fetch result (generation {} superseded)", generation);
            return;
        }

        let mut state = self.state.lock().expect("fetch state poisoned");
        state.loading = false;
        match result {
            Ok(data) => {
                state.data = Some(data);
                state.error = None;
            }
            Err(e) => {
                state.data = None;
                state.error = Some(e.to_string());
            }
        }
    }

    pub fn state(&self) -> FetchState<T> {
        self.state.lock().expect("fetch state poisoned").clone()
    }

    pub fn data(&self) -> Option<T> {
        self.state.lock().expect("fetch state poisoned").data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().expect("fetch state poisoned").loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().expect("fetch state poisoned").error.clone()
    }

    /// Pure state transition; `data` is untouched.
    pub fn clear_error(&self) {
        self.state.lock().expect("fetch state poisoned").error = None;
    }
}

impl<T: Clone> Default for FetchController<T> {
    fn default() -> Self {
        Self::new()
    }
}
