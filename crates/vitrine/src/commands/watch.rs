//! `vitrine watch`: a live surface printed as it changes.
//!
//! Table and plain output print one status line per visible change; JSON
//! and YAML emit every snapshot as its own document.

use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;
use tracing::{debug, info};

use vitrine_api::RestCollectionClient;
use vitrine_config::Config;
use vitrine_core::{FeedState, FetchState, Surface, SurfaceSnapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    service: RestCollectionClient,
    cfg: &Config,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut surface_cfg = vitrine_config::surface_config(cfg, &args.surface)?;
    surface_cfg.initial_filter = util::resolve_filter(args.filter.as_deref(), &surface_cfg)?;
    if let Some(ms) = args.interval_ms {
        surface_cfg.autoplay_interval = util::interval(ms)?;
    }
    if args.no_autoplay {
        surface_cfg.autoplay = false;
    }

    let surface = Surface::new(Arc::new(service), surface_cfg);
    let mut updates = surface.subscribe();
    surface.activate().await;

    let color = output::should_color(&global.color);
    let deadline = tokio::time::sleep(args.duration.map_or(Duration::MAX, Duration::from_secs));
    tokio::pin!(deadline);

    let mut printer = Printer::new(&global.output, color);
    loop {
        tokio::select! {
            () = &mut deadline => {
                debug!("watch duration elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = Arc::clone(&updates.borrow_and_update());
                if let Some(out) = printer.render(&snapshot)? {
                    output::print_output(&out, global.quiet);
                }
            }
        }
    }

    surface.deactivate().await;
    Ok(())
}

// ── Rendering ────────────────────────────────────────────────────────

struct Printer<'a> {
    format: &'a OutputFormat,
    color: bool,
    last_line: Option<String>,
}

impl<'a> Printer<'a> {
    fn new(format: &'a OutputFormat, color: bool) -> Self {
        Self {
            format,
            color,
            last_line: None,
        }
    }

    /// Output for one snapshot, or `None` when nothing visible changed.
    fn render(&mut self, snapshot: &SurfaceSnapshot) -> Result<Option<String>, CliError> {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonCompact => {
                Ok(Some(output::render_json_compact(snapshot)?))
            }
            OutputFormat::Yaml => Ok(Some(format!("---\n{}", serde_yaml::to_string(snapshot)?))),
            OutputFormat::Table | OutputFormat::Plain => {
                let line = status_line(snapshot, self.color);
                if self.last_line.as_ref() == Some(&line) {
                    return Ok(None);
                }
                self.last_line = Some(line.clone());
                let stamp = chrono::Local::now().format("%H:%M:%S");
                Ok(Some(format!("[{stamp}] {line}")))
            }
        }
    }
}

/// One-line summary: position, play state, current title, and any
/// degraded fetch or feed state.
pub fn status_line(snapshot: &SurfaceSnapshot, color: bool) -> String {
    let position = match snapshot.current_index {
        Some(i) => format!("{}/{}", i + 1, snapshot.items.len()),
        None => format!("-/{}", snapshot.items.len()),
    };
    let glyph = if snapshot.is_playing { ">" } else { "||" };

    let body = match (&snapshot.fetch_state, snapshot.current_item()) {
        (FetchState::Loading, _) => "loading...".to_owned(),
        (FetchState::Failed { message }, _) => paint(color, format!("fetch failed: {message}"), Tone::Bad),
        (FetchState::Ready, None) => "no items".to_owned(),
        (FetchState::Ready, Some(item)) => {
            let title = item.title().unwrap_or("(untitled)");
            let title = if color {
                title.bold().to_string()
            } else {
                title.to_owned()
            };
            match item.category_name() {
                Some(category) => format!("{title} ({category})"),
                None => title,
            }
        }
    };

    let mut line = format!(
        "{} {position} {glyph} {body}",
        paint(color, format!("[{}:{}]", snapshot.surface, snapshot.filter), Tone::Dim)
    );
    match &snapshot.feed {
        FeedState::Lost { reason } => {
            line.push_str(&format!("  {}", paint(color, format!("feed lost: {reason}"), Tone::Bad)));
        }
        FeedState::Unavailable { reason } => {
            line.push_str(&format!("  {}", paint(color, format!("no feed: {reason}"), Tone::Warn)));
        }
        FeedState::Off | FeedState::Live => {}
    }
    if snapshot.refreshing {
        line.push_str(&format!("  {}", paint(color, "refreshing".to_owned(), Tone::Dim)));
    }
    line
}

#[derive(Clone, Copy)]
enum Tone {
    Dim,
    Warn,
    Bad,
}

fn paint(color: bool, text: String, tone: Tone) -> String {
    if !color {
        return text;
    }
    match tone {
        Tone::Dim => text.dimmed().to_string(),
        Tone::Warn => text.yellow().to_string(),
        Tone::Bad => text.red().to_string(),
    }
}
