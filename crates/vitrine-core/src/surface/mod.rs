// ── Surface abstraction ──
//
// One mounted view over one collection. Cheap to clone; every clone talks
// to the same event loop. Activation opens the change feed and starts the
// loop, deactivation tears both down. Operations on an inactive surface
// fail with `SurfaceInactive`.

mod command;
mod runner;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vitrine_api::CollectionService;

use self::command::{CommandEnvelope, SurfaceCommand};
use self::runner::SurfaceRunner;
use crate::carousel::Phase;
use crate::config::SurfaceConfig;
use crate::convert::items_from_records;
use crate::error::CoreError;
use crate::filter::{FetchReason, Filter};
use crate::model::CollectionItem;
use crate::store::{FetchState, ItemSequence};
use crate::stream::{ItemStream, SnapshotStream};

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── FeedState ────────────────────────────────────────────────────────

/// Live-update status of a surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FeedState {
    /// Not subscribed: inactive, or live updates disabled.
    Off,
    Live,
    /// The feed dropped after retries ran out. Data is frozen at the last
    /// fetch until the next activation or a manual refresh.
    Lost { reason: String },
    /// The feed could not be opened on activation.
    Unavailable { reason: String },
}

// ── SurfaceSnapshot ──────────────────────────────────────────────────

/// Everything a renderer needs, captured after one event.
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceSnapshot {
    pub surface: String,
    pub collection: String,
    pub items: ItemSequence,
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub phase: Phase,
    pub fetch_state: FetchState,
    pub filter: Filter,
    pub feed: FeedState,
    pub active: bool,
    /// A fetch is outstanding; `items` may be about to change.
    pub refreshing: bool,
    pub autoplay_armed: bool,
    /// Bumped on every item replacement.
    pub version: u64,
}

impl SurfaceSnapshot {
    fn initial(config: &SurfaceConfig) -> Self {
        Self {
            surface: config.name.clone(),
            collection: config.collection.clone(),
            items: Arc::new(Vec::new()),
            current_index: None,
            is_playing: config.autoplay,
            phase: Phase::Idle,
            fetch_state: FetchState::Loading,
            filter: config.initial_filter,
            feed: FeedState::Off,
            active: false,
            refreshing: false,
            autoplay_armed: false,
            version: 0,
        }
    }

    /// The item at `current_index`.
    pub fn current_item(&self) -> Option<&Arc<CollectionItem>> {
        self.current_index.and_then(|i| self.items.get(i))
    }
}

// ── Surface ──────────────────────────────────────────────────────────

pub struct Surface<S: CollectionService> {
    inner: Arc<SurfaceInner<S>>,
}

impl<S: CollectionService> Clone for Surface<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SurfaceInner<S: CollectionService> {
    service: Arc<S>,
    config: SurfaceConfig,
    snapshot_tx: Arc<watch::Sender<Arc<SurfaceSnapshot>>>,
    items_tx: Arc<watch::Sender<ItemSequence>>,
    /// Parent of every activation's token; cancelled when the last clone
    /// goes away.
    cancel: CancellationToken,
    active: Mutex<Option<ActiveLoop>>,
}

struct ActiveLoop {
    command_tx: mpsc::Sender<CommandEnvelope>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<S: CollectionService> Drop for SurfaceInner<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<S: CollectionService> Surface<S> {
    /// Create an inactive surface. Call [`activate()`](Self::activate) to
    /// start fetching.
    pub fn new(service: Arc<S>, config: SurfaceConfig) -> Self {
        let snapshot_tx = Arc::new(watch::Sender::new(Arc::new(SurfaceSnapshot::initial(
            &config,
        ))));
        let items_tx = Arc::new(watch::Sender::new(Arc::new(Vec::new())));

        Self {
            inner: Arc::new(SurfaceInner {
                service,
                config,
                snapshot_tx,
                items_tx,
                cancel: CancellationToken::new(),
                active: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the change feed, issue the initial fetch, and start the event
    /// loop. A no-op on an active surface.
    pub async fn activate(&self) {
        let mut active = self.inner.active.lock().await;
        if active.is_some() {
            debug!(surface = %self.inner.config.name, "already active");
            return;
        }

        let mut runner = SurfaceRunner::new(
            Arc::clone(&self.inner.service),
            self.inner.config.clone(),
            Arc::clone(&self.inner.items_tx),
            Arc::clone(&self.inner.snapshot_tx),
        );
        runner.open_feed().await;
        runner.refetch(FetchReason::Initial);

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = self.inner.cancel.child_token();
        let task = tokio::spawn(runner.run(command_rx, cancel.clone()));

        *active = Some(ActiveLoop {
            command_tx,
            cancel,
            task,
        });
        info!(
            surface = %self.inner.config.name,
            collection = %self.inner.config.collection,
            "surface activated"
        );
    }

    /// Stop the event loop and release the change feed. Safe to call
    /// repeatedly.
    pub async fn deactivate(&self) {
        let Some(active) = self.inner.active.lock().await.take() else {
            return;
        };
        active.cancel.cancel();
        if let Err(e) = active.task.await {
            warn!(surface = %self.inner.config.name, error = %e, "surface loop ended abnormally");
        }
        debug!(surface = %self.inner.config.name, "surface deactivated");
    }

    pub async fn is_active(&self) -> bool {
        self.inner.active.lock().await.is_some()
    }

    // ── Operations ───────────────────────────────────────────────────

    pub async fn next(&self) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::Next).await
    }

    pub async fn prev(&self) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::Prev).await
    }

    /// Jump to `index`, wrapped into range.
    pub async fn go_to(&self, index: usize) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::GoTo(index)).await
    }

    pub async fn toggle_autoplay(&self) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::ToggleAutoplay).await
    }

    pub async fn pointer_enter(&self) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::PointerEnter).await
    }

    pub async fn pointer_leave(&self) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::PointerLeave).await
    }

    pub async fn touch_start(&self, x: f64) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::TouchStart(x)).await
    }

    pub async fn touch_move(&self, x: f64) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::TouchMove(x)).await
    }

    /// Finish a touch; a long enough horizontal travel navigates.
    pub async fn touch_end(&self) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::TouchEnd).await
    }

    /// Switch filters. Re-selecting the active filter does not fetch; a
    /// filter this surface does not offer is rejected without a query.
    pub async fn set_filter(&self, filter: Filter) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        let filter = self.inner.config.check_filter(filter)?;
        self.send(SurfaceCommand::SetFilter(filter)).await
    }

    /// Parse and apply a filter value. Values outside the enumerated set, or
    /// not offered here, are rejected before anything is queried.
    pub async fn set_filter_str(&self, raw: &str) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        let filter: Filter = raw.parse()?;
        self.set_filter(filter).await
    }

    /// Re-run the current query.
    pub async fn refresh(&self) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::Refresh).await
    }

    /// The loop's current snapshot, round-tripped through the loop.
    pub async fn snapshot(&self) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        self.send(SurfaceCommand::Snapshot).await
    }

    async fn send(&self, command: SurfaceCommand) -> Result<Arc<SurfaceSnapshot>, CoreError> {
        let command_tx = match self.inner.active.lock().await.as_ref() {
            Some(active) => active.command_tx.clone(),
            None => return Err(self.inactive()),
        };

        let (tx, rx) = oneshot::channel();
        command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| self.inactive())?;

        rx.await.map_err(|_| self.inactive())
    }

    fn inactive(&self) -> CoreError {
        CoreError::SurfaceInactive {
            collection: self.inner.config.collection.clone(),
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    /// The last published snapshot, without a round-trip.
    pub fn current(&self) -> Arc<SurfaceSnapshot> {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SurfaceSnapshot>> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn snapshots(&self) -> SnapshotStream {
        SnapshotStream::new(self.subscribe())
    }

    /// Item sequences only; survives deactivation and reactivation.
    pub fn items(&self) -> ItemStream {
        ItemStream::new(self.inner.items_tx.subscribe())
    }

    // ── One-shot ─────────────────────────────────────────────────────

    /// Run the query `config` describes under `filter`, without a feed or
    /// carousel.
    pub async fn fetch_once(
        service: &S,
        config: &SurfaceConfig,
        filter: Filter,
    ) -> Result<Vec<Arc<CollectionItem>>, CoreError> {
        let query = config.query(filter);
        debug!(%query, "one-shot fetch");
        let records = service.query(&query).await?;
        Ok(items_from_records(records))
    }
}

impl<S: CollectionService> std::fmt::Debug for Surface<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("name", &self.inner.config.name)
            .field("collection", &self.inner.config.collection)
            .finish_non_exhaustive()
    }
}
