//! `vitrine demo`: a scripted session against an in-memory collection.
//!
//! Exercises the whole engine without a service: initial fetch, an
//! autoplay tick, hover suspend and resume, a swipe, a filter change, a
//! live insert, and teardown. Each step is recorded from the snapshot the
//! surface published.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tabled::Tabled;
use tokio::sync::watch;
use tracing::debug;

use vitrine_api::{MemoryCollectionService, Record};
use vitrine_core::{FeedState, FetchState, Filter, ItemStatus, Surface, SurfaceConfig, SurfaceSnapshot};

use crate::cli::{DemoArgs, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

const COLLECTION: &str = "projects";

#[derive(Debug, Serialize)]
struct DemoStep {
    step: usize,
    action: &'static str,
    index: Option<usize>,
    count: usize,
    title: Option<String>,
    playing: bool,
    filter: String,
    feed: FeedState,
    active: bool,
}

impl DemoStep {
    fn capture(step: usize, action: &'static str, snapshot: &SurfaceSnapshot) -> Self {
        Self {
            step,
            action,
            index: snapshot.current_index,
            count: snapshot.items.len(),
            title: snapshot
                .current_item()
                .and_then(|item| item.title().map(str::to_owned)),
            playing: snapshot.is_playing,
            filter: snapshot.filter.to_string(),
            feed: snapshot.feed.clone(),
            active: snapshot.active,
        }
    }
}

#[derive(Tabled)]
struct DemoRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "Action")]
    action: &'static str,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Current")]
    title: String,
    #[tabled(rename = "Playing")]
    playing: &'static str,
    #[tabled(rename = "Filter")]
    filter: String,
    #[tabled(rename = "Feed")]
    feed: &'static str,
}

impl From<&DemoStep> for DemoRow {
    fn from(s: &DemoStep) -> Self {
        Self {
            step: s.step,
            action: s.action,
            position: s
                .index
                .map_or_else(|| format!("-/{}", s.count), |i| format!("{}/{}", i + 1, s.count)),
            title: s.title.clone().unwrap_or_else(|| "-".into()),
            playing: if s.playing { "yes" } else { "no" },
            filter: s.filter.clone(),
            feed: match s.feed {
                FeedState::Off => "off",
                FeedState::Live => "live",
                FeedState::Lost { .. } => "lost",
                FeedState::Unavailable { .. } => "unavailable",
            },
        }
    }
}

fn project(id: u32, title: &str, category: &str, status: &str, created_at: &str) -> Option<Record> {
    Record::from_value(json!({
        "id": id,
        "title": title,
        "category": category,
        "status": status,
        "created_at": created_at,
    }))
}

fn seed(service: &MemoryCollectionService) {
    service.seed(
        COLLECTION,
        [
            project(4, "Harbor Lights", "Video", "ongoing", "2024-06-01T09:00:00Z"),
            project(3, "Northwind Storefront", "Website", "completed", "2024-05-01T09:00:00Z"),
            project(2, "Fieldnotes Rebrand", "Graphics", "completed", "2024-04-01T09:00:00Z"),
            project(1, "Spring Launch Ads", "Ads", "ongoing", "2024-03-01T09:00:00Z"),
        ]
        .into_iter()
        .flatten(),
    );
}

/// Wait for a snapshot matching `pred`, or fail after `limit`.
async fn wait_for(
    rx: &mut watch::Receiver<Arc<SurfaceSnapshot>>,
    limit: Duration,
    what: &str,
    pred: impl FnMut(&Arc<SurfaceSnapshot>) -> bool,
) -> Result<Arc<SurfaceSnapshot>, CliError> {
    match tokio::time::timeout(limit, rx.wait_for(pred)).await {
        Ok(Ok(snapshot)) => Ok(Arc::clone(&snapshot)),
        Ok(Err(_)) => Err(CliError::Internal(format!("surface closed while waiting for {what}"))),
        Err(_) => Err(CliError::Internal(format!(
            "timed out after {}ms waiting for {what}",
            limit.as_millis()
        ))),
    }
}

pub async fn handle(args: DemoArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let interval = util::interval(args.interval_ms)?;
    let limit = interval * 4 + Duration::from_secs(5);

    let service = Arc::new(MemoryCollectionService::new());
    seed(&service);

    let surface_cfg = SurfaceConfig {
        autoplay_interval: interval,
        ..SurfaceConfig::portfolio()
    };
    let surface = Surface::new(Arc::clone(&service), surface_cfg);
    let mut rx = surface.subscribe();
    let mut steps = Vec::new();
    let mut record = |action: &'static str, snapshot: &Arc<SurfaceSnapshot>| {
        debug!(action, index = ?snapshot.current_index, "demo step");
        steps.push(DemoStep::capture(steps.len() + 1, action, snapshot));
    };

    surface.activate().await;
    let snap = wait_for(&mut rx, limit, "the initial fetch", |s| {
        s.fetch_state == FetchState::Ready
    })
    .await?;
    record("activate", &snap);

    let snap = wait_for(&mut rx, limit, "an autoplay tick", |s| {
        s.current_index == Some(1)
    })
    .await?;
    record("autoplay tick", &snap);

    record("pointer enter", &surface.pointer_enter().await?);
    record("pointer leave", &surface.pointer_leave().await?);

    surface.touch_start(240.0).await?;
    surface.touch_move(120.0).await?;
    record("swipe left", &surface.touch_end().await?);

    surface.set_filter(Filter::Status(ItemStatus::Completed)).await?;
    let snap = wait_for(&mut rx, limit, "the filtered fetch", |s| {
        s.filter == Filter::Status(ItemStatus::Completed) && !s.refreshing
    })
    .await?;
    record("filter completed", &snap);

    let version = snap.version;
    if let Some(row) = project(5, "Atlas Annual Report", "Graphics", "completed", "2024-07-01T09:00:00Z") {
        service.insert(COLLECTION, row);
    }
    let snap = wait_for(&mut rx, limit, "the change notice", |s| s.version > version).await?;
    record("remote insert", &snap);

    record("toggle autoplay", &surface.toggle_autoplay().await?);

    surface.deactivate().await;
    record("deactivate", &surface.current());

    let out = output::render_list(
        &global.output,
        &steps,
        |s| DemoRow::from(s),
        |s| format!("{} {}", s.step, s.action),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
