//! Live collection mirrors and carousel engines for vitrine views.
//!
//! This crate sits between `vitrine-api` and the things that render
//! collections (the CLI today):
//!
//! - **[`Surface`]**: one mounted view over one collection.
//!   [`activate()`](Surface::activate) opens a change feed, runs the initial
//!   fetch, and starts an event loop that owns all view state; every
//!   operation is a message to that loop answered with a
//!   [`SurfaceSnapshot`]. [`Surface::fetch_once()`] runs a single query for
//!   one-shot CLI use.
//!
//! - **[`FilterController`]**: the active filter plus fetch tickets. A fetch
//!   response is applied only if its ticket is newer than the last applied
//!   one, so overlapping fetches cannot resurrect stale data.
//!
//! - **Carousel engine** ([`carousel`]): a pure index/play state machine, a
//!   swipe recognizer, and an autoplay scheduler on `tokio::time`.
//!
//! - **[`SubscriptionHandle`]**: a change feed acquired on activation and
//!   released exactly once, on deactivation or drop.
//!
//! - **Domain model** ([`model`]): [`CollectionItem`] built from raw
//!   records, with [`Category`], [`ItemStatus`], and the [`Icon`] registry.

pub mod carousel;
pub mod config;
pub mod convert;
pub mod error;
pub mod filter;
pub mod model;
pub mod store;
pub mod stream;
pub mod subscription;
pub mod summary;
pub mod surface;

// ── Primary re-exports ──────────────────────────────────────────────
pub use carousel::{
    AutoplayScheduler, Carousel, GestureRecognizer, IndexPolicy, Phase, SwipeIntent,
    TimerDirective,
};
pub use config::{ServiceConfig, SurfaceConfig, TlsVerification};
pub use error::CoreError;
pub use filter::{FetchReason, FetchTicket, Filter, FilterController};
pub use model::{Category, CollectionItem, Icon, ItemId, ItemStatus};
pub use store::{FetchState, ItemSequence};
pub use stream::{ItemStream, SnapshotStream};
pub use subscription::SubscriptionHandle;
pub use summary::{DashboardSummary, summarize};
pub use surface::{FeedState, Surface, SurfaceSnapshot};
