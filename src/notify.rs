//! User-facing error copy and notification debouncing.
//!
//! Mapping status codes to copy is a presentation concern layered above
//! the data layer; it lives here as a pure lookup so every consumer
//! renders the same words for the same failure.

use crate::error::Error;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Fixed copy for well-known statuses, with a generic fallback.
pub fn user_message(status: u16) -> &'static str {
    match status {
        401 => "You need to sign in to do that.",
        403 => "You don't have permission to do that.",
        404 => "We couldn't find what you were looking for.",
        429 => "Too many requests. Please wait a moment and try again.",
        500 => "Something went wrong on our end. Please try again.",
        503 => "The service is temporarily unavailable. Please try again shortly.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Copy for a failure, with dedicated wording for timeouts and
/// unreachable servers.
pub fn display_message(error: &Error) -> String {
    match error {
        Error::Timeout(_) => {
            "The request took too long. Check your connection and try again.".to_string()
        }
        Error::ServerError { status: None, .. } => {
            "We couldn't reach the server. Check your connection.".to_string()
        }
        Error::ServerError {
            status: Some(status),
            ..
        } => user_message(*status).to_string(),
        Error::ClientError { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Suppresses identical repeated notifications within a short window.
///
/// Keyed by `(message, code)`, so a retry storm hammering one endpoint
/// surfaces a single alert rather than one per attempt, while distinct
/// failures still get through.
pub struct ErrorDebouncer {
    window: Duration,
    seen: Mutex<HashMap<(String, Option<u16>), Instant>>,
}

impl ErrorDebouncer {
    pub fn new(window: Duration) -> Self {
        ErrorDebouncer {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Whether this notification should be shown now. Records it if so.
    pub fn should_notify(&self, message: &str, code: Option<u16>) -> bool {
        let mut seen = self.seen.lock().expect("debouncer state poisoned");
        let now = Instant::now();

        // Drop stale keys before they accumulate.
        seen.retain(|_, last| now.duration_since(*last) < self.window);

        match seen.get(&(message.to_string(), code)) {
            Some(_) => false,
            None => {
                seen.insert((message.to_string(), code), now);
                true
            }
        }
    }

    pub fn should_notify_error(&self, error: &Error) -> bool {
        self.should_notify(&display_message(error), error.status())
    }
}

impl Default for ErrorDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
