// ── Local mirror of one watched collection ──
//
// Holds the last successfully fetched item sequence and publishes it
// through a `watch` channel. Sequences are replaced wholesale, never
// patched; every replacement bumps a version counter.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::model::CollectionItem;

/// An immutable, ordered item sequence.
pub type ItemSequence = Arc<Vec<Arc<CollectionItem>>>;

/// Outcome of the most recent applied fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FetchState {
    /// Nothing has resolved yet.
    Loading,
    Ready,
    /// The last fetch failed; the sequence is empty.
    Failed { message: String },
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// The sender outlives any one activation: the surface owns it, and each
/// activation's mirror publishes into it.
pub(crate) struct ItemMirror {
    items: Arc<watch::Sender<ItemSequence>>,
    state: FetchState,
    version: u64,
}

impl ItemMirror {
    /// Every activation starts from an empty sequence.
    pub(crate) fn new(items: Arc<watch::Sender<ItemSequence>>) -> Self {
        items.send_if_modified(|seq| {
            if seq.is_empty() {
                return false;
            }
            *seq = Arc::new(Vec::new());
            true
        });
        Self {
            items,
            state: FetchState::Loading,
            version: 0,
        }
    }

    /// Install a freshly fetched sequence.
    pub(crate) fn replace(&mut self, items: Vec<Arc<CollectionItem>>) {
        self.publish(Arc::new(items));
        self.state = FetchState::Ready;
    }

    /// A fetch failed: fall back to "no items".
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.publish(Arc::new(Vec::new()));
        self.state = FetchState::Failed {
            message: message.into(),
        };
    }

    pub(crate) fn snapshot(&self) -> ItemSequence {
        self.items.borrow().clone()
    }

    pub(crate) fn state(&self) -> &FetchState {
        &self.state
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    fn publish(&mut self, items: ItemSequence) {
        // `send_replace` updates unconditionally, even with zero receivers.
        self.items.send_replace(items);
        self.version += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::ItemId;
    use indexmap::IndexMap;

    fn item(id: &str) -> Arc<CollectionItem> {
        Arc::new(CollectionItem {
            id: ItemId::from(id),
            created_at: None,
            category: None,
            status: None,
            sort_order: None,
            fields: IndexMap::new(),
        })
    }

    fn channel() -> Arc<watch::Sender<ItemSequence>> {
        Arc::new(watch::Sender::new(Arc::new(Vec::new())))
    }

    #[test]
    fn starts_loading_and_empty() {
        let mirror = ItemMirror::new(channel());
        assert!(mirror.state().is_loading());
        assert!(mirror.snapshot().is_empty());
        assert_eq!(mirror.version(), 0);
    }

    #[test]
    fn replace_publishes_whole_sequence() {
        let tx = channel();
        let mut mirror = ItemMirror::new(Arc::clone(&tx));
        let mut rx = tx.subscribe();

        mirror.replace(vec![item("a"), item("b")]);
        assert_eq!(mirror.state(), &FetchState::Ready);
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].id, ItemId::from("b"));

        mirror.fail("boom");
        assert!(mirror.state().is_failed());
        assert!(mirror.snapshot().is_empty());
        assert_eq!(mirror.version(), 2);
        assert!(rx.has_changed().unwrap());
    }
}
