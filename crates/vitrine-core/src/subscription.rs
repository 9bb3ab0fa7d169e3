// ── Scoped change-feed subscription ──
//
// One open feed per (collection, surface). The handle is acquired when a
// surface activates and released exactly once: by `release()` on
// deactivation, or by `Drop` on any other exit path.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use vitrine_api::{ChangeNotice, CollectionService, FeedHandle};

use crate::error::CoreError;

pub struct SubscriptionHandle {
    collection: String,
    feed: Option<FeedHandle>,
}

impl SubscriptionHandle {
    /// Open a change feed on `collection`.
    pub async fn open<S: CollectionService>(
        service: &S,
        collection: &str,
    ) -> Result<Self, CoreError> {
        let feed = service.watch(collection).await.map_err(|e| {
            CoreError::SubscriptionLost {
                collection: collection.to_owned(),
                reason: e.to_string(),
            }
        })?;
        debug!(collection, "change feed opened");
        Ok(Self::from_feed(feed))
    }

    pub fn from_feed(feed: FeedHandle) -> Self {
        Self {
            collection: feed.collection().to_owned(),
            feed: Some(feed),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// A receiver for change notices; `None` after release.
    pub fn notices(&self) -> Option<broadcast::Receiver<Arc<ChangeNotice>>> {
        self.feed.as_ref().map(FeedHandle::subscribe)
    }

    pub fn is_released(&self) -> bool {
        self.feed.is_none()
    }

    /// Shut the feed down. Returns `true` only on the call that actually
    /// released it.
    pub fn release(&mut self) -> bool {
        match self.feed.take() {
            Some(feed) => {
                feed.shutdown();
                info!(collection = %self.collection, "change feed released");
                true
            }
            None => false,
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("collection", &self.collection)
            .field("released", &self.is_released())
            .finish()
    }
}
