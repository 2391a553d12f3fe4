//! Manual retry with capped exponential backoff.
//!
//! Standalone wrapper for any asynchronous operation, composable with
//! (not layered under) the request client's own retry loop.

use crate::error::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// Backoff schedule for [`Retrier`].
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Additional attempts after the initial one.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Ceiling the backoff never exceeds.
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
        }
    }
}

/// Retries an operation with `min(initial_delay * backoff_factor^attempt,
/// max_delay)` between attempts, surfacing the final failure only once
/// every attempt is exhausted.
///
/// `retry_count` and `is_retrying` are live during the run so a caller
/// can render "retrying (2/3)…" feedback; `reset` clears both without
/// affecting an in-flight attempt.
pub struct Retrier {
    config: RetryConfig,
    retry_count: AtomicU32,
    is_retrying: AtomicBool,
}

impl Retrier {
    pub fn new(config: RetryConfig) -> Self {
        Retrier {
            config,
            retry_count: AtomicU32::new(0),
            is_retrying: AtomicBool::new(false),
        }
    }

    /// Run `operation`, retrying on failure per the configured schedule.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => {
                    self.is_retrying.store(false, Ordering::SeqCst);
                    return Ok(value);
                }
                Err(e) if attempt < self.config.max_retries => {
                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    self.retry_count.store(attempt, Ordering::SeqCst);
                    self.is_retrying.store(true, Ordering::SeqCst);
                    debug!("✗ attempt {} failed ({}), retrying in {:?}", attempt, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.is_retrying.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped = scaled.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::SeqCst)
    }

    pub fn is_retrying(&self) -> bool {
        self.is_retrying.load(Ordering::SeqCst)
    }

    /// Clear the feedback counters. Does not cancel anything in flight.
    pub fn reset(&self) {
        self.retry_count.store(0, Ordering::SeqCst);
        self.is_retrying.store(false, Ordering::SeqCst);
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
