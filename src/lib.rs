//! # fetch-kit
//!
//! A resilient, type-safe client data layer for Rust.
//!
//! ## Features
//!
//! - **Resilient Requests:** Timeout-bounded calls with exponential-backoff
//!   retry and a pluggable interceptor chain
//! - **Multi-Backend Caching:** Expiring entries across volatile, durable,
//!   and session-scoped namespaces with lazy eviction and a background sweep
//! - **Bounded Preloading:** FIFO asset warm-up with a fixed number of
//!   in-flight slots and per-key deduplication
//! - **Fetch Orchestration:** Generation-guarded fetch state, paginated
//!   accumulation with id-dedup, infinite-scroll triggering, manual retry
//! - **Type Safe:** Generic over `serde` payloads end to end, no magic strings
//! - **Production Ready:** Built-in logging, stats, and error recovery
//!
//! ## Quick Start
//!
//! ```ignore
//! use fetch_kit::{
//!     client::{ClientConfig, RequestClient},
//!     store::{Backend, CacheStore, SetOptions, StoreConfig},
//! };
//! use std::time::Duration;
//!
//! // 1. A client for the API
//! let client = RequestClient::new(ClientConfig {
//!     base_url: "https://photos.example.com/api".to_string(),
//!     ..ClientConfig::default()
//! });
//!
//! // 2. A cache for whatever moves through it
//! let store = CacheStore::new(StoreConfig::default());
//!
//! // 3. Load a page, consulting the cache first
//! let key = "photos:page:1";
//! let page = match store.get(key, Backend::Volatile).await {
//!     Some(cached) => cached,
//!     None => {
//!         let page = client.photos::<Photo>(1, 50).await?;
//!         store.set(key, &page, SetOptions::ttl(Duration::from_secs(300))).await;
//!         page
//!     }
//! };
//! ```

#[macro_use]
extern crate log;

pub mod client;
pub mod error;
pub mod fetch;
pub mod notify;
pub mod preload;
pub mod store;

// Re-exports for convenience
pub use client::{ClientConfig, PageEnvelope, RequestClient, RequestDescriptor};
pub use error::{Error, Result};
pub use fetch::{FetchController, PagedLoader, Retrier, RetryConfig, ScrollTrigger};
pub use preload::{Preloader, PreloaderConfig};
pub use store::{Backend, CacheStore, SetOptions, StoreConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
