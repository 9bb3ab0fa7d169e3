// ── Collection service contract ──
//
// The one seam between the sync engine and whatever store holds the data.
// A service answers ordered queries and hands out change-feed handles;
// notices carry no payload the consumer is allowed to act on beyond
// "re-run the last query".

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::query::Query;
use crate::record::Record;

/// Capacity of every change-feed broadcast channel.
pub const FEED_CHANNEL_CAPACITY: usize = 256;

// ── ChangeNotice ─────────────────────────────────────────────────────

/// What the feed said happened. Kept for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// The feed reconnected; notices may have been missed.
    Resync,
    #[serde(other)]
    Other,
}

impl ChangeKind {
    /// Parse a feed-provided event type, mapping anything unknown to `Other`.
    pub fn parse_lossy(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Other)
    }
}

/// A payload-free "something changed" signal for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub collection: String,
    pub kind: ChangeKind,
}

impl ChangeNotice {
    pub fn new(collection: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            collection: collection.into(),
            kind,
        }
    }
}

// ── FeedHandle ───────────────────────────────────────────────────────

/// Handle to one open change-feed subscription.
///
/// The channel closing (every `recv` returning `Closed`) means the feed is
/// gone for good; the service will not re-establish it.
pub struct FeedHandle {
    collection: String,
    notice_rx: broadcast::Receiver<Arc<ChangeNotice>>,
    cancel: CancellationToken,
}

impl FeedHandle {
    pub fn new(
        collection: impl Into<String>,
        notice_rx: broadcast::Receiver<Arc<ChangeNotice>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            collection: collection.into(),
            notice_rx,
            cancel,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Get a new receiver for change notices.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ChangeNotice>> {
        self.notice_rx.resubscribe()
    }

    /// Stop the feed and release its connection.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("collection", &self.collection)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

// ── CollectionService ────────────────────────────────────────────────

/// A remote (or in-process) store of named collections.
pub trait CollectionService: Send + Sync + 'static {
    /// Run one ordered query and return the matching rows.
    fn query(&self, query: &Query) -> impl Future<Output = Result<Vec<Record>, Error>> + Send;

    /// Open a change feed scoped to `collection`.
    fn watch(&self, collection: &str) -> impl Future<Output = Result<FeedHandle, Error>> + Send;
}

impl<S: CollectionService> CollectionService for Arc<S> {
    fn query(&self, query: &Query) -> impl Future<Output = Result<Vec<Record>, Error>> + Send {
        S::query(self, query)
    }

    fn watch(&self, collection: &str) -> impl Future<Output = Result<FeedHandle, Error>> + Send {
        S::watch(self, collection)
    }
}
