// ── Surface event loop ──
//
// One task per active surface owns every piece of mutable view state.
// Fetches run as separate tasks and report back over a channel tagged
// with their ticket; the loop alone decides what gets applied.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vitrine_api::{ChangeNotice, CollectionService, Record};

use super::command::{CommandEnvelope, SurfaceCommand};
use super::{FeedState, SurfaceSnapshot};
use crate::carousel::{AutoplayScheduler, Carousel, GestureRecognizer, SwipeIntent, TimerDirective};
use crate::config::SurfaceConfig;
use crate::convert::items_from_records;
use crate::error::CoreError;
use crate::filter::{FetchReason, FetchTicket, FilterController};
use crate::store::{ItemMirror, ItemSequence};
use crate::subscription::SubscriptionHandle;

/// A resolved fetch, as reported by its task.
struct FetchOutcome {
    ticket: FetchTicket,
    result: Result<Vec<Record>, CoreError>,
}

pub(crate) struct SurfaceRunner<S: CollectionService> {
    service: Arc<S>,
    config: SurfaceConfig,
    filter: FilterController,
    carousel: Carousel,
    gesture: GestureRecognizer,
    autoplay: AutoplayScheduler,
    mirror: ItemMirror,
    subscription: Option<SubscriptionHandle>,
    notices: Option<broadcast::Receiver<Arc<ChangeNotice>>>,
    feed: FeedState,
    fetch_tx: mpsc::UnboundedSender<FetchOutcome>,
    fetch_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    snapshot_tx: Arc<watch::Sender<Arc<SurfaceSnapshot>>>,
}

impl<S: CollectionService> SurfaceRunner<S> {
    pub(crate) fn new(
        service: Arc<S>,
        config: SurfaceConfig,
        items_tx: Arc<watch::Sender<ItemSequence>>,
        snapshot_tx: Arc<watch::Sender<Arc<SurfaceSnapshot>>>,
    ) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        Self {
            filter: FilterController::new(config.initial_filter),
            carousel: Carousel::new(config.autoplay, config.index_policy),
            gesture: GestureRecognizer::new(config.swipe_threshold),
            autoplay: AutoplayScheduler::new(config.autoplay_interval),
            mirror: ItemMirror::new(items_tx),
            subscription: None,
            notices: None,
            feed: FeedState::Off,
            fetch_tx,
            fetch_rx,
            snapshot_tx,
            service,
            config,
        }
    }

    /// Open the change feed if this surface is live. Failure leaves the
    /// surface usable without live updates.
    pub(crate) async fn open_feed(&mut self) {
        if !self.config.live {
            return;
        }
        match SubscriptionHandle::open(&*self.service, &self.config.collection).await {
            Ok(handle) => {
                self.notices = handle.notices();
                self.subscription = Some(handle);
                self.feed = FeedState::Live;
            }
            Err(e) => {
                warn!(surface = %self.config.name, error = %e, "change feed unavailable");
                self.feed = FeedState::Unavailable {
                    reason: e.to_string(),
                };
            }
        }
    }

    /// Issue a fetch under a fresh ticket.
    pub(crate) fn refetch(&mut self, reason: FetchReason) {
        let ticket = self.filter.issue(reason);
        self.start_fetch(ticket);
    }

    fn start_fetch(&self, ticket: FetchTicket) {
        let query = self.config.query(ticket.filter);
        debug!(
            surface = %self.config.name,
            ticket = ticket.seq,
            reason = %ticket.reason,
            %query,
            "fetch issued"
        );

        let service = Arc::clone(&self.service);
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = service.query(&query).await.map_err(CoreError::from);
            // The loop may be gone; a late response is simply dropped.
            let _ = tx.send(FetchOutcome { ticket, result });
        });
    }

    // ── Event loop ───────────────────────────────────────────────────

    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<CommandEnvelope>,
        cancel: CancellationToken,
    ) {
        self.publish(true);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(outcome) = self.fetch_rx.recv() => {
                    self.apply_fetch(outcome);
                    self.publish(true);
                }
                envelope = commands.recv() => {
                    let Some(envelope) = envelope else { break };
                    self.handle(envelope.command);
                    let snapshot = self.publish(true);
                    let _ = envelope.response_tx.send(snapshot);
                }
                notice = next_notice(&mut self.notices) => {
                    self.on_notice(notice);
                    self.publish(true);
                }
                () = self.autoplay.tick() => {
                    let directive = self.carousel.tick();
                    self.autoplay.apply(directive);
                    self.publish(true);
                }
            }
        }

        self.teardown();
    }

    fn teardown(&mut self) {
        self.autoplay.disarm();
        self.notices = None;
        if let Some(mut handle) = self.subscription.take() {
            handle.release();
        }
        self.feed = FeedState::Off;
        self.publish(false);
        info!(surface = %self.config.name, "surface loop stopped");
    }

    // ── Handlers ─────────────────────────────────────────────────────

    fn handle(&mut self, command: SurfaceCommand) {
        let directive = match command {
            SurfaceCommand::Next => self.carousel.next(),
            SurfaceCommand::Prev => self.carousel.prev(),
            SurfaceCommand::GoTo(index) => self.carousel.go_to(index),
            SurfaceCommand::ToggleAutoplay => self.carousel.toggle_autoplay(),
            SurfaceCommand::PointerEnter => self.carousel.pointer_enter(),
            SurfaceCommand::PointerLeave => self.carousel.pointer_leave(),
            SurfaceCommand::TouchStart(x) => {
                self.gesture.touch_start(x);
                TimerDirective::Keep
            }
            SurfaceCommand::TouchMove(x) => {
                self.gesture.touch_move(x);
                TimerDirective::Keep
            }
            SurfaceCommand::TouchEnd => match self.gesture.touch_end() {
                Some(SwipeIntent::Next) => self.carousel.next(),
                Some(SwipeIntent::Prev) => self.carousel.prev(),
                None => TimerDirective::Keep,
            },
            SurfaceCommand::SetFilter(filter) => {
                if let Some(ticket) = self.filter.set(filter) {
                    info!(surface = %self.config.name, %filter, "filter changed");
                    self.start_fetch(ticket);
                }
                TimerDirective::Keep
            }
            SurfaceCommand::Refresh => {
                self.refetch(FetchReason::Manual);
                TimerDirective::Keep
            }
            SurfaceCommand::Snapshot => TimerDirective::Keep,
        };
        self.autoplay.apply(directive);
    }

    fn apply_fetch(&mut self, outcome: FetchOutcome) {
        let FetchOutcome { ticket, result } = outcome;

        if !self.filter.accept(&ticket) {
            debug!(
                surface = %self.config.name,
                ticket = ticket.seq,
                applied = self.filter.last_applied(),
                "discarding stale fetch response"
            );
            return;
        }

        let directive = match result {
            Ok(records) => {
                let items = items_from_records(records);
                debug!(surface = %self.config.name, ticket = ticket.seq, items = items.len(), "fetch applied");
                let directive = self.carousel.replace_items(items.len());
                self.mirror.replace(items);
                directive
            }
            Err(e) => {
                warn!(surface = %self.config.name, ticket = ticket.seq, error = %e, "query failed, showing no items");
                self.mirror.fail(e.to_string());
                self.carousel.replace_items(0)
            }
        };
        self.autoplay.apply(directive);
    }

    fn on_notice(&mut self, notice: Result<Arc<ChangeNotice>, broadcast::error::RecvError>) {
        match notice {
            Ok(notice) => {
                debug!(surface = %self.config.name, kind = %notice.kind, "change notice");
                self.refetch(FetchReason::ChangeFeed);
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!(surface = %self.config.name, missed, "change notices lagged");
                self.refetch(FetchReason::ChangeFeed);
            }
            Err(broadcast::error::RecvError::Closed) => {
                let lost = CoreError::SubscriptionLost {
                    collection: self.config.collection.clone(),
                    reason: "feed closed".into(),
                };
                warn!(surface = %self.config.name, error = %lost, "live updates stopped");
                self.notices = None;
                if let Some(mut handle) = self.subscription.take() {
                    handle.release();
                }
                self.feed = FeedState::Lost {
                    reason: "feed closed".into(),
                };
            }
        }
    }

    // ── Publishing ───────────────────────────────────────────────────

    pub(crate) fn publish(&self, active: bool) -> Arc<SurfaceSnapshot> {
        let items = self.mirror.snapshot();
        let snapshot = Arc::new(SurfaceSnapshot {
            surface: self.config.name.clone(),
            collection: self.config.collection.clone(),
            current_index: self.carousel.index(),
            is_playing: self.carousel.is_playing(),
            phase: self.carousel.phase(),
            fetch_state: self.mirror.state().clone(),
            filter: self.filter.current(),
            feed: self.feed.clone(),
            active,
            refreshing: self.filter.has_pending(),
            autoplay_armed: self.autoplay.is_armed(),
            version: self.mirror.version(),
            items,
        });
        self.snapshot_tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }
}

/// Next notice from the feed; pending forever when there is none.
async fn next_notice(
    notices: &mut Option<broadcast::Receiver<Arc<ChangeNotice>>>,
) -> Result<Arc<ChangeNotice>, broadcast::error::RecvError> {
    match notices {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
