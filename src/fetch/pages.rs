//! Paginated accumulation with id-deduplication.

use crate::client::PageEnvelope;
use crate::error::Result;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;

/// An item with a stable identifier, used as the dedup key when pages are
/// merged.
pub trait PageItem {
    fn id(&self) -> String;
}

/// Accumulated list state.
#[derive(Clone, Debug)]
pub struct PagedState<T> {
    /// Ordered, unique by id.
    pub items: Vec<T>,
    pub current_page: u32,
    pub has_next: bool,
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for PagedState<T> {
    fn default() -> Self {
        PagedState {
            items: Vec::new(),
            current_page: 0,
            has_next: false,
            total: 0,
            loading: false,
            error: None,
        }
    }
}

/// Incremental loader for paginated list views.
///
/// `load_page` with `append = false` replaces the accumulated items
/// wholesale (page 1 / refresh); with `append = true` it merges the
/// incoming page, dropping any item whose id is already present, so
/// existing order is preserved and only novel entries are appended.
///
/// Calls are issued by a single logical caller at a time: a `load_more`
/// arriving while a load is in flight is suppressed, not queued. Errors
/// during `load_more` leave the accumulated items in place and set only
/// the error field, so the caller can retry without losing what was
/// already shown.
pub struct PagedLoader<T> {
    state: Mutex<PagedState<T>>,
}

impl<T: PageItem + Clone> PagedLoader<T> {
    pub fn new() -> Self {
        PagedLoader {
            state: Mutex::new(PagedState::default()),
        }
    }

    /// Fetch one page through the injected fetch function.
    pub async fn load_page<F, Fut>(&self, page: u32, append: bool, fetch: F)
    where
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = Result<PageEnvelope<T>>>,
    {
        {
            let mut state = self.state.lock().expect("paged state poisoned");
            if state.loading {
                debug!("✗ load_page {} suppressed (load in flight)", page);
                return;
            }
            state.loading = true;
            state.error = None;
        }

        let result = fetch(page).await;

        let mut state = self.state.lock().expect("paged state poisoned");
        state.loading = false;
        match result {
            Ok(envelope) => {
                if append {
                    let mut seen: HashSet<String> =
                        state.items.iter().map(|item| item.id()).collect();
                    let novel: Vec<T> = envelope
                        .items
                        .into_iter()
                        .filter(|item| seen.insert(item.id()))
                        .collect();
                    debug!("✓ page {} merged ({} novel items)", page, novel.len());
                    state.items.extend(novel);
                } else {
                    debug!("✓ page {} loaded ({} items)", page, envelope.items.len());
                    state.items = envelope.items;
                }
                state.current_page = page;
                state.has_next = envelope.has_next;
                state.total = envelope.total;
            }
            Err(e) => {
                // Accumulated items survive; only the error surfaces.
                state.error = Some(e.to_string());
            }
        }
    }

    /// Fetch the next page, if there is one and nothing is in flight.
    pub async fn load_more<F, Fut>(&self, fetch: F)
    where
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = Result<PageEnvelope<T>>>,
    {
        let next = {
            let state = self.state.lock().expect("paged state poisoned");
            if !state.has_next || state.loading {
                debug!(
                    "✗ load_more suppressed (has_next: {}, loading: {})",
                    state.has_next, state.loading
                );
                return;
            }
            state.current_page + 1
        };
        self.load_page(next, true, fetch).await;
    }

    /// Reset to an empty accumulator and reload page 1.
    pub async fn refresh<F, Fut>(&self, fetch: F)
    where
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = Result<PageEnvelope<T>>>,
    {
        {
            let mut state = self.state.lock().expect("paged state poisoned");
            if state.loading {
                debug!("✗ refresh suppressed (load in flight)");
                return;
            }
            *state = PagedState::default();
        }
        self.load_page(1, false, fetch).await;
    }

    pub fn state(&self) -> PagedState<T> {
        self.state.lock().expect("paged state poisoned").clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.lock().expect("paged state poisoned").items.clone()
    }

    pub fn has_next(&self) -> bool {
        self.state.lock().expect("paged state poisoned").has_next
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().expect("paged state poisoned").loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().expect("paged state poisoned").error.clone()
    }

    pub fn clear_error(&self) {
        self.state.lock().expect("paged state poisoned").error = None;
    }
}

impl<T: PageItem + Clone> Default for PagedLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}
