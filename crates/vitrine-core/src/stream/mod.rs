// ── Reactive streams ──
//
// Subscription types for consuming item sequences and surface snapshots.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::CollectionItem;
use crate::surface::SurfaceSnapshot;

type Items = Arc<Vec<Arc<CollectionItem>>>;

/// A subscription to one surface's item sequence.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via [`changed`](Self::changed) or by converting to a `Stream`.
pub struct ItemStream {
    current: Items,
    receiver: watch::Receiver<Items>,
}

impl ItemStream {
    pub(crate) fn new(receiver: watch::Receiver<Items>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The sequence captured at creation (or at the last `changed`).
    pub fn current(&self) -> &Items {
        &self.current
    }

    /// The latest sequence, which may be newer than `current`.
    pub fn latest(&self) -> Items {
        self.receiver.borrow().clone()
    }

    /// Whether a newer sequence has been published since the last `changed`.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next replacement. `None` once the surface is gone.
    pub async fn changed(&mut self) -> Option<Items> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> ItemWatchStream {
        ItemWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each new item sequence.
pub struct ItemWatchStream {
    inner: WatchStream<Items>,
}

impl Stream for ItemWatchStream {
    type Item = Items;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// `Stream` of surface snapshots, starting with the current one.
pub struct SnapshotStream {
    inner: WatchStream<Arc<SurfaceSnapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<SurfaceSnapshot>>) -> Self {
        Self {
            inner: WatchStream::new(receiver),
        }
    }
}

impl Stream for SnapshotStream {
    type Item = Arc<SurfaceSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
