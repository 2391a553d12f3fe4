//! Stateful data-fetch orchestration.
//!
//! The pieces presentation code talks to: a generic load/error/retry
//! state machine ([`FetchController`]), a paginated incremental loader
//! with id-dedup ([`PagedLoader`]), an infinite-scroll trigger
//! ([`ScrollTrigger`]), and a manual backoff helper ([`Retrier`]).
//!
//! Everything here consumes an injected fetch function (typically a
//! closure over [`crate::client::RequestClient`], but any async producer
//! works), and none of it lets an error escape as a panic or a raw `Err`:
//! failures settle into observable state.

pub mod pages;
pub mod retry;
pub mod scroll;
pub mod state;

pub use pages::{PagedLoader, PagedState, PageItem};
pub use retry::{Retrier, RetryConfig};
pub use scroll::ScrollTrigger;
pub use state::{FetchController, FetchState};
