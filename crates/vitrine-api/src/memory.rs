// ── In-process collection service ──
//
// Holds collections in memory, answers queries with the same filter, order,
// and limit semantics as the REST endpoint, and broadcasts one change notice
// per mutation. Fault injection hooks let callers exercise the degraded paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::query::Query;
use crate::record::Record;
use crate::service::{ChangeKind, ChangeNotice, CollectionService, FEED_CHANNEL_CAPACITY, FeedHandle};

/// Per-collection feed plumbing.
struct Feed {
    notice_tx: broadcast::Sender<Arc<ChangeNotice>>,
    watchers: Vec<CancellationToken>,
}

impl Feed {
    fn new() -> Self {
        let (notice_tx, _) = broadcast::channel(FEED_CHANNEL_CAPACITY);
        Self {
            notice_tx,
            watchers: Vec::new(),
        }
    }
}

/// A [`CollectionService`] backed by process memory.
#[derive(Default)]
pub struct MemoryCollectionService {
    collections: DashMap<String, Vec<Record>>,
    feeds: DashMap<String, Feed>,
    failing_queries: AtomicU32,
    queries: AtomicU64,
}

impl MemoryCollectionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or keep) an empty collection.
    pub fn ensure_collection(&self, collection: &str) {
        self.collections.entry(collection.to_owned()).or_default();
    }

    /// Replace the whole contents of a collection without notifying watchers.
    pub fn seed(&self, collection: &str, records: impl IntoIterator<Item = Record>) {
        self.collections
            .insert(collection.to_owned(), records.into_iter().collect());
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn insert(&self, collection: &str, record: Record) {
        self.collections
            .entry(collection.to_owned())
            .or_default()
            .push(record);
        self.notify(collection, ChangeKind::Insert);
    }

    /// Replace the record with the same id. Returns `false` if none matched.
    pub fn update(&self, collection: &str, record: Record) -> bool {
        let Some(id) = record.id() else {
            return false;
        };
        let replaced = self
            .collections
            .get_mut(collection)
            .and_then(|mut rows| {
                let slot = rows.iter_mut().find(|r| r.id().as_deref() == Some(id.as_str()))?;
                *slot = record;
                Some(())
            })
            .is_some();
        if replaced {
            self.notify(collection, ChangeKind::Update);
        }
        replaced
    }

    /// Delete the record with this id. Returns the removed record.
    pub fn remove(&self, collection: &str, id: &str) -> Option<Record> {
        let removed = self.collections.get_mut(collection).and_then(|mut rows| {
            let pos = rows.iter().position(|r| r.id().as_deref() == Some(id))?;
            Some(rows.remove(pos))
        });
        if removed.is_some() {
            self.notify(collection, ChangeKind::Delete);
        }
        removed
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |rows| rows.len())
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    // ── Fault injection ──────────────────────────────────────────────

    /// Make the next `n` queries fail with a 503.
    pub fn fail_next_queries(&self, n: u32) {
        self.failing_queries.store(n, Ordering::SeqCst);
    }

    /// Drop every open feed on `collection`; subscribers observe the channel
    /// closing. Later `watch` calls get a fresh feed.
    pub fn sever_feeds(&self, collection: &str) {
        if let Some(mut feed) = self.feeds.get_mut(collection) {
            tracing::debug!(collection, "severing change feeds");
            *feed = Feed::new();
        }
    }

    // ── Introspection ────────────────────────────────────────────────

    /// Total queries received, failed ones included.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Watches on `collection` that have not been shut down.
    pub fn open_watches(&self, collection: &str) -> usize {
        self.feeds.get(collection).map_or(0, |feed| {
            feed.watchers.iter().filter(|t| !t.is_cancelled()).count()
        })
    }

    fn notify(&self, collection: &str, kind: ChangeKind) {
        if let Some(feed) = self.feeds.get(collection) {
            // No live receivers is fine.
            let _ = feed
                .notice_tx
                .send(Arc::new(ChangeNotice::new(collection, kind)));
        }
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_queries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl CollectionService for MemoryCollectionService {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, Error> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if self.take_injected_failure() {
            return Err(Error::Query {
                collection: query.collection.clone(),
                status: 503,
                message: "injected failure".into(),
            });
        }

        let rows = self
            .collections
            .get(&query.collection)
            .ok_or_else(|| Error::UnknownCollection(query.collection.clone()))?;
        Ok(query.apply(rows.iter()))
    }

    async fn watch(&self, collection: &str) -> Result<FeedHandle, Error> {
        let mut feed = self.feeds.entry(collection.to_owned()).or_insert_with(Feed::new);
        feed.watchers.retain(|t| !t.is_cancelled());

        let cancel = CancellationToken::new();
        feed.watchers.push(cancel.clone());
        Ok(FeedHandle::new(collection, feed.notice_tx.subscribe(), cancel))
    }
}
