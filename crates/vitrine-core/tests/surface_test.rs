#![allow(clippy::unwrap_used)]
// Surface lifecycle tests against in-process services, on paused time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use vitrine_api::{
    ChangeKind, ChangeNotice, CollectionService, Error, FeedHandle, MemoryCollectionService, Query,
    Record,
};
use vitrine_core::{
    Category, CoreError, FeedState, FetchState, Filter, ItemStatus, Phase, Surface, SurfaceConfig,
    SurfaceSnapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn record(id: u32, created: &str, status: &str) -> Record {
    Record::from_value(json!({
        "id": id,
        "title": format!("Project {id}"),
        "created_at": created,
        "status": status,
    }))
    .unwrap()
}

/// Three projects, newest first: 1, 2, 3.
fn three_projects() -> Vec<Record> {
    vec![
        record(1, "2024-03-01T00:00:00Z", "completed"),
        record(2, "2024-02-01T00:00:00Z", "ongoing"),
        record(3, "2024-01-01T00:00:00Z", "completed"),
    ]
}

fn categorized(id: u32, category: &str, status: &str) -> Record {
    Record::from_value(json!({
        "id": id,
        "title": format!("Project {id}"),
        "created_at": format!("2024-0{id}-01T00:00:00Z"),
        "category": category,
        "status": status,
    }))
    .unwrap()
}

fn memory_with(records: Vec<Record>) -> Arc<MemoryCollectionService> {
    let svc = Arc::new(MemoryCollectionService::new());
    svc.seed("projects", records);
    svc
}

fn manual() -> SurfaceConfig {
    SurfaceConfig {
        autoplay: false,
        ..SurfaceConfig::portfolio()
    }
}

async fn wait_until<S, F>(surface: &Surface<S>, pred: F) -> Arc<SurfaceSnapshot>
where
    S: CollectionService,
    F: Fn(&SurfaceSnapshot) -> bool,
{
    let mut rx = surface.subscribe();
    let snap = tokio::time::timeout(Duration::from_secs(60), rx.wait_for(|s| pred(s)))
        .await
        .expect("surface never reached the expected state")
        .unwrap();
    Arc::clone(&snap)
}

async fn ready<S: CollectionService>(surface: &Surface<S>) -> Arc<SurfaceSnapshot> {
    wait_until(surface, |s| s.active && s.fetch_state == FetchState::Ready).await
}

fn ids(snap: &SurfaceSnapshot) -> Vec<String> {
    snap.items.iter().map(|item| item.id.to_string()).collect()
}

// ── Scripted service ────────────────────────────────────────────────

/// Answers queries from a queue of `(delay, response)` pairs, falling back
/// to an immediate empty result, and exposes a feed the test drives.
struct ScriptedService {
    script: Mutex<VecDeque<(Duration, Result<Vec<Record>, Error>)>>,
    queries: AtomicU64,
    feed: broadcast::Sender<Arc<ChangeNotice>>,
}

impl ScriptedService {
    fn new() -> Arc<Self> {
        let (feed, _) = broadcast::channel(16);
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            queries: AtomicU64::new(0),
            feed,
        })
    }

    fn respond(&self, delay_ms: u64, records: Vec<Record>) {
        self.script
            .lock()
            .unwrap()
            .push_back((Duration::from_millis(delay_ms), Ok(records)));
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }
}

impl CollectionService for ScriptedService {
    async fn query(&self, _query: &Query) -> Result<Vec<Record>, Error> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let (delay, response) = next.unwrap_or((Duration::ZERO, Ok(Vec::new())));
        tokio::time::sleep(delay).await;
        response
    }

    async fn watch(&self, collection: &str) -> Result<FeedHandle, Error> {
        Ok(FeedHandle::new(
            collection,
            self.feed.subscribe(),
            CancellationToken::new(),
        ))
    }
}

// ── Autoplay ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn autoplay_advances_each_period_and_wraps() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(svc, SurfaceConfig::portfolio());
    surface.activate().await;

    let snap = ready(&surface).await;
    assert_eq!(snap.current_index, Some(0));
    assert_eq!(snap.phase, Phase::Playing);
    assert!(snap.autoplay_armed);

    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(surface.current().current_index, Some(1));

    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(surface.current().current_index, Some(2));

    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(surface.current().current_index, Some(0));

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn hover_suspends_and_leave_resumes() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(svc, SurfaceConfig::portfolio());
    surface.activate().await;
    ready(&surface).await;

    let snap = surface.pointer_enter().await.unwrap();
    assert!(!snap.autoplay_armed);
    assert!(snap.is_playing);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(surface.current().current_index, Some(0));

    let snap = surface.pointer_leave().await.unwrap();
    assert!(snap.autoplay_armed);

    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(surface.current().current_index, Some(1));

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn hover_across_an_emptying_refetch_resumes_on_leave() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), SurfaceConfig::portfolio());
    surface.activate().await;
    ready(&surface).await;

    assert!(!surface.pointer_enter().await.unwrap().autoplay_armed);

    for id in ["1", "2", "3"] {
        svc.remove("projects", id).unwrap();
    }
    let snap = wait_until(&surface, |s| s.items.is_empty() && !s.refreshing).await;
    assert_eq!(snap.phase, Phase::Idle);
    assert!(!snap.autoplay_armed);

    svc.insert("projects", record(4, "2024-04-01T00:00:00Z", "ongoing"));
    svc.insert("projects", record(5, "2024-05-01T00:00:00Z", "ongoing"));
    let snap = wait_until(&surface, |s| s.items.len() == 2 && !s.refreshing).await;
    assert_eq!(snap.phase, Phase::Playing);
    assert!(!snap.autoplay_armed, "refill while hovered must not arm");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(surface.current().current_index, Some(0));

    assert!(surface.pointer_leave().await.unwrap().autoplay_armed);
    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(surface.current().current_index, Some(1));

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn toggling_autoplay_off_stops_ticks() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(svc, SurfaceConfig::portfolio());
    surface.activate().await;
    ready(&surface).await;

    let snap = surface.toggle_autoplay().await.unwrap();
    assert_eq!(snap.phase, Phase::Paused);
    assert!(!snap.autoplay_armed);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(surface.current().current_index, Some(0));

    // Leaving while paused does not restart the timer.
    surface.pointer_enter().await.unwrap();
    let snap = surface.pointer_leave().await.unwrap();
    assert!(!snap.autoplay_armed);

    surface.deactivate().await;
}

// ── Navigation ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn swipe_navigates_past_threshold_only() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(svc, manual());
    surface.activate().await;
    ready(&surface).await;

    surface.touch_start(200.0).await.unwrap();
    surface.touch_move(120.0).await.unwrap();
    let snap = surface.touch_end().await.unwrap();
    assert_eq!(snap.current_index, Some(1));

    // Exactly at the threshold is not a swipe.
    surface.touch_start(100.0).await.unwrap();
    surface.touch_move(150.0).await.unwrap();
    let snap = surface.touch_end().await.unwrap();
    assert_eq!(snap.current_index, Some(1));

    surface.touch_start(100.0).await.unwrap();
    surface.touch_move(151.0).await.unwrap();
    let snap = surface.touch_end().await.unwrap();
    assert_eq!(snap.current_index, Some(0));

    // A tap never navigates.
    surface.touch_start(10.0).await.unwrap();
    let snap = surface.touch_end().await.unwrap();
    assert_eq!(snap.current_index, Some(0));

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn single_item_navigation_is_a_noop() {
    let svc = memory_with(vec![record(1, "2024-01-01T00:00:00Z", "completed")]);
    let surface = Surface::new(svc, manual());
    surface.activate().await;
    ready(&surface).await;

    assert_eq!(surface.next().await.unwrap().current_index, Some(0));
    assert_eq!(surface.prev().await.unwrap().current_index, Some(0));
    surface.touch_start(300.0).await.unwrap();
    surface.touch_move(0.0).await.unwrap();
    assert_eq!(surface.touch_end().await.unwrap().current_index, Some(0));

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn go_to_wraps_into_range() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(svc, manual());
    surface.activate().await;
    ready(&surface).await;

    assert_eq!(surface.go_to(2).await.unwrap().current_index, Some(2));
    assert_eq!(surface.go_to(4).await.unwrap().current_index, Some(1));

    surface.deactivate().await;
}

// ── Filters ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn filter_change_fetches_once_and_keeps_old_items_until_resolved() {
    let svc = ScriptedService::new();
    svc.respond(0, three_projects());
    svc.respond(500, vec![record(1, "2024-03-01T00:00:00Z", "completed")]);

    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    ready(&surface).await;
    assert_eq!(svc.query_count(), 1);

    let snap = surface
        .set_filter(Filter::Status(ItemStatus::Completed))
        .await
        .unwrap();
    assert!(snap.refreshing);
    assert_eq!(snap.items.len(), 3);

    let snap = wait_until(&surface, |s| !s.refreshing).await;
    assert_eq!(ids(&snap), ["1"]);
    assert_eq!(svc.query_count(), 2);
    assert_eq!(snap.filter, Filter::Status(ItemStatus::Completed));

    // Re-selecting the active filter does not query.
    let snap = surface.set_filter_str("completed").await.unwrap();
    assert!(!snap.refreshing);
    assert_eq!(svc.query_count(), 2);

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn invalid_filter_is_rejected_without_querying() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    ready(&surface).await;
    let before = svc.query_count();

    let err = surface.set_filter_str("archived").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidFilter { ref value, .. } if value == "archived"));
    assert_eq!(svc.query_count(), before);
    assert_eq!(surface.current().filter, Filter::All);

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn category_page_filter_narrows_within_its_category() {
    let svc = memory_with(vec![
        categorized(4, "Video", "ongoing"),
        categorized(3, "Video", "completed"),
        categorized(2, "Website", "completed"),
        categorized(1, "Video", "completed"),
    ]);
    let surface = Surface::new(
        Arc::clone(&svc),
        SurfaceConfig::projects_by_category(Category::Video),
    );
    surface.activate().await;
    let snap = ready(&surface).await;
    assert_eq!(ids(&snap), ["4", "3", "1"]);
    assert_eq!(snap.filter, Filter::All);

    let completed = Filter::Status(ItemStatus::Completed);
    surface.set_filter(completed).await.unwrap();
    let snap = wait_until(&surface, |s| s.filter == completed && !s.refreshing).await;
    assert_eq!(ids(&snap), ["3", "1"]);

    surface.set_filter(Filter::All).await.unwrap();
    let snap = wait_until(&surface, |s| s.filter == Filter::All && !s.refreshing).await;
    assert_eq!(ids(&snap), ["4", "3", "1"]);

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn filters_the_surface_does_not_offer_are_rejected() {
    let svc = Arc::new(MemoryCollectionService::new());
    svc.seed(
        "services",
        [Record::from_value(json!({ "id": 1, "name": "Web Development", "sort_order": 1 })).unwrap()],
    );
    let surface = Surface::new(Arc::clone(&svc), SurfaceConfig::services());
    surface.activate().await;
    ready(&surface).await;
    let before = svc.query_count();

    let err = surface.set_filter_str("video").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidFilter { ref value, .. } if value == "video"));
    let err = surface
        .set_filter(Filter::Status(ItemStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidFilter { .. }));

    assert_eq!(svc.query_count(), before);
    assert_eq!(surface.current().filter, Filter::All);

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn stale_response_never_overwrites_a_fresher_one() {
    let svc = ScriptedService::new();
    svc.respond(0, three_projects());
    svc.respond(1000, vec![record(9, "2023-01-01T00:00:00Z", "ongoing")]);
    svc.respond(100, vec![record(1, "2024-03-01T00:00:00Z", "completed")]);

    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    ready(&surface).await;

    surface.refresh().await.unwrap();
    surface.refresh().await.unwrap();

    let snap = wait_until(&surface, |s| s.items.len() == 1).await;
    assert_eq!(ids(&snap), ["1"]);
    assert!(!snap.refreshing);

    // Let the slow first refresh land; it must be discarded.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let snap = surface.snapshot().await.unwrap();
    assert_eq!(ids(&snap), ["1"]);
    assert_eq!(svc.query_count(), 3);

    surface.deactivate().await;
}

// ── Change feed ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn change_notice_refetches_and_index_is_clamped_not_tracked() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), SurfaceConfig::portfolio());
    surface.activate().await;
    let snap = ready(&surface).await;
    assert_eq!(snap.feed, FeedState::Live);

    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(surface.current().current_index, Some(1));

    surface.toggle_autoplay().await.unwrap();
    assert_eq!(surface.prev().await.unwrap().current_index, Some(0));
    assert_eq!(surface.next().await.unwrap().current_index, Some(1));

    // Item 2 sits at index 1; deleting it leaves index 1 on item 3.
    svc.remove("projects", "2").unwrap();
    let snap = wait_until(&surface, |s| s.items.len() == 2).await;
    assert_eq!(snap.current_index, Some(1));
    assert_eq!(snap.current_item().unwrap().id.to_string(), "3");

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn deleting_the_next_item_keeps_index_zero() {
    // [1, 2, 3] at 0, playing; one tick, then back.
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), SurfaceConfig::portfolio());
    surface.activate().await;
    ready(&surface).await;

    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(surface.current().current_index, Some(1));
    surface.toggle_autoplay().await.unwrap();
    assert_eq!(surface.prev().await.unwrap().current_index, Some(0));

    // Re-fetch returns [1, 3].
    svc.remove("projects", "2").unwrap();
    let snap = wait_until(&surface, |s| s.items.len() == 2).await;
    assert_eq!(ids(&snap), ["1", "3"]);
    assert_eq!(snap.current_index, Some(0));
    assert_eq!(snap.current_item().unwrap().id.to_string(), "1");

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn shrinking_past_the_index_clamps_to_last() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    ready(&surface).await;

    surface.go_to(2).await.unwrap();
    svc.remove("projects", "3").unwrap();
    let snap = wait_until(&surface, |s| s.items.len() == 2).await;
    assert_eq!(snap.current_index, Some(1));

    svc.remove("projects", "1").unwrap();
    svc.remove("projects", "2").unwrap();
    let snap = wait_until(&surface, |s| s.items.is_empty() && !s.refreshing).await;
    assert_eq!(snap.current_index, None);
    assert_eq!(snap.phase, Phase::Idle);

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn severed_feed_is_reported_lost() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    ready(&surface).await;

    svc.sever_feeds("projects");
    let snap = wait_until(&surface, |s| matches!(s.feed, FeedState::Lost { .. })).await;
    assert_eq!(snap.items.len(), 3);
    assert_eq!(svc.open_watches("projects"), 0);

    // Manual refresh still works.
    svc.insert("projects", record(4, "2024-04-01T00:00:00Z", "ongoing"));
    surface.refresh().await.unwrap();
    let snap = wait_until(&surface, |s| s.items.len() == 4).await;
    assert_eq!(ids(&snap)[0], "4");

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn scripted_feed_notice_triggers_refetch() {
    let svc = ScriptedService::new();
    svc.respond(0, three_projects());
    svc.respond(0, vec![record(1, "2024-03-01T00:00:00Z", "completed")]);

    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    ready(&surface).await;

    svc.feed
        .send(Arc::new(ChangeNotice::new("projects", ChangeKind::Delete)))
        .unwrap();
    let snap = wait_until(&surface, |s| s.items.len() == 1).await;
    assert_eq!(snap.version, 2);
    assert_eq!(svc.query_count(), 2);

    surface.deactivate().await;
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn query_failure_shows_no_items_until_refresh() {
    let svc = memory_with(three_projects());
    svc.fail_next_queries(1);

    let surface = Surface::new(Arc::clone(&svc), SurfaceConfig::portfolio());
    surface.activate().await;

    let snap = wait_until(&surface, |s| s.fetch_state.is_failed()).await;
    assert!(snap.items.is_empty());
    assert_eq!(snap.current_index, None);
    assert!(!snap.autoplay_armed);

    surface.refresh().await.unwrap();
    let snap = ready(&surface).await;
    assert_eq!(snap.items.len(), 3);
    assert!(snap.autoplay_armed);

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn missing_collection_degrades_to_failed() {
    let svc = Arc::new(MemoryCollectionService::new());
    let surface = Surface::new(svc, SurfaceConfig::testimonials());
    surface.activate().await;

    let snap = wait_until(&surface, |s| s.fetch_state.is_failed()).await;
    assert!(snap.items.is_empty());

    surface.deactivate().await;
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn deactivate_releases_feed_and_rejects_operations() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    ready(&surface).await;
    assert_eq!(svc.open_watches("projects"), 1);

    // Activating twice keeps one loop and one feed.
    surface.activate().await;
    assert_eq!(svc.open_watches("projects"), 1);

    surface.deactivate().await;
    assert_eq!(svc.open_watches("projects"), 0);
    assert!(!surface.is_active().await);

    let snap = surface.current();
    assert!(!snap.active);
    assert_eq!(snap.feed, FeedState::Off);

    let err = surface.next().await.unwrap_err();
    assert!(matches!(err, CoreError::SurfaceInactive { ref collection } if collection == "projects"));

    surface.deactivate().await;
    assert_eq!(svc.open_watches("projects"), 0);
}

#[tokio::test(start_paused = true)]
async fn reactivation_starts_fresh() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    ready(&surface).await;
    surface.go_to(2).await.unwrap();
    surface.deactivate().await;

    surface.activate().await;
    let snap = ready(&surface).await;
    assert_eq!(snap.current_index, Some(0));
    assert_eq!(snap.feed, FeedState::Live);
    assert_eq!(svc.open_watches("projects"), 1);

    surface.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn fetch_resolving_after_deactivation_is_discarded() {
    let svc = ScriptedService::new();
    svc.respond(1000, three_projects());

    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    surface.deactivate().await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    let snap = surface.current();
    assert!(snap.items.is_empty());
    assert_eq!(snap.fetch_state, FetchState::Loading);
    assert_eq!(svc.query_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_surface_releases_the_feed() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), manual());
    surface.activate().await;
    ready(&surface).await;
    assert_eq!(svc.open_watches("projects"), 1);

    drop(surface);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(svc.open_watches("projects"), 0);
}

#[tokio::test(start_paused = true)]
async fn not_live_surface_opens_no_feed() {
    let svc = memory_with(three_projects());
    let mut config = manual();
    config.live = false;

    let surface = Surface::new(Arc::clone(&svc), config);
    surface.activate().await;
    let snap = ready(&surface).await;
    assert_eq!(snap.feed, FeedState::Off);
    assert_eq!(svc.open_watches("projects"), 0);

    surface.deactivate().await;
}

// ── Observation ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn snapshot_and_item_streams_follow_the_loop() {
    let svc = memory_with(three_projects());
    let surface = Surface::new(Arc::clone(&svc), manual());
    let mut items = surface.items();
    let mut snapshots = surface.snapshots();

    let first = snapshots.next().await.unwrap();
    assert!(!first.active);

    surface.activate().await;
    let seq = items.changed().await.unwrap();
    assert_eq!(seq.len(), 3);
    assert_eq!(items.current().len(), 3);

    surface.deactivate().await;
}

#[tokio::test]
async fn fetch_once_applies_filter_without_activation() {
    let svc = memory_with(three_projects());
    let items = Surface::fetch_once(
        &*svc,
        &SurfaceConfig::portfolio(),
        Filter::Status(ItemStatus::Completed),
    )
    .await
    .unwrap();

    let titles: Vec<_> = items.iter().filter_map(|i| i.title()).collect();
    assert_eq!(titles, ["Project 1", "Project 3"]);
    assert_eq!(svc.open_watches("projects"), 0);
}
