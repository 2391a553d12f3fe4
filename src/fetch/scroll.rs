//! Infinite-scroll trigger.

use crate::error::Result;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fires a fetch-more callback when a sentinel becomes visible.
///
/// `observe` receives visibility notifications for the sentinel position
/// at the end of a list. On the transition from hidden to visible, and
/// only then, the callback is invoked, provided more pages exist and no
/// previous invocation is still settling. The in-flight flag holds until
/// the callback's future settles (success or failure alike), so a slow
/// fetch is never stacked behind a second one, no matter how many
/// visibility notifications arrive meanwhile.
///
/// The trigger owns nothing beyond the callback; dropping it releases
/// every registration. The callback's future runs as a spawned task, so
/// `observe` must be called from within a tokio runtime.
///
/// # Example
///
/// ```ignore
/// let trigger = ScrollTrigger::new(move || {
///     let loader = Arc::clone(&loader);
///     let client = Arc::clone(&client);
///     Box::pin(async move {
///         loader.load_more(|page| client.photos(page, 50).map_ok(...)).await;
///         Ok(())
///     })
/// });
/// trigger.set_has_next(true);
/// trigger.observe(sentinel_visible);
/// ```
pub struct ScrollTrigger {
    fetch_more: Box<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>,
    has_next: AtomicBool,
    in_flight: Arc<AtomicBool>,
    was_visible: AtomicBool,
}

impl ScrollTrigger {
    pub fn new<F>(fetch_more: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        ScrollTrigger {
            fetch_more: Box::new(fetch_more),
            has_next: AtomicBool::new(false),
            in_flight: Arc::new(AtomicBool::new(false)),
            was_visible: AtomicBool::new(false),
        }
    }

    /// Feed pagination state in; a hidden sentinel with no further pages
    /// never fires.
    pub fn set_has_next(&self, has_next: bool) {
        self.has_next.store(has_next, Ordering::SeqCst);
    }

    /// Deliver a visibility notification for the sentinel.
    pub fn observe(&self, visible: bool) {
        let was = self.was_visible.swap(visible, Ordering::SeqCst);
        if !visible || was {
            return;
        }
        if !self.has_next.load(Ordering::SeqCst) {
            return;
        }
        // Claim the in-flight slot; a concurrent rising edge loses.
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!("» sentinel visible, fetching next page");
        let settled = (self.fetch_more)();
        let in_flight = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            if let Err(e) = settled.await {
                debug!("✗ fetch-more failed: {}", e);
            }
            in_flight.store(false, Ordering::SeqCst);
        });
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}
