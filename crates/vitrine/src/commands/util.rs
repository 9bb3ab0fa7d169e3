//! Shared helpers for command handlers.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use vitrine_core::{CollectionItem, Filter, SurfaceConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// One item as a table row.
#[derive(Tabled)]
pub struct ItemRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Created")]
    pub created: String,
}

impl From<&Arc<CollectionItem>> for ItemRow {
    fn from(item: &Arc<CollectionItem>) -> Self {
        Self {
            id: item.id.to_string(),
            title: item.title().unwrap_or("-").to_owned(),
            category: item.category_name().unwrap_or("-").to_owned(),
            status: item
                .status
                .map_or_else(|| "-".into(), |s| s.as_str().to_owned()),
            created: item
                .created_at
                .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d").to_string()),
        }
    }
}

/// `--filter` if given and offered by the surface, else the surface's
/// initial filter.
pub fn resolve_filter(raw: Option<&str>, surface: &SurfaceConfig) -> Result<Filter, CliError> {
    match raw {
        Some(raw) => Ok(surface.check_filter(raw.parse::<Filter>()?)?),
        None => Ok(surface.initial_filter),
    }
}

/// Validate an autoplay period given in milliseconds.
pub fn interval(ms: u64) -> Result<Duration, CliError> {
    if ms == 0 {
        return Err(CliError::Validation {
            field: "interval-ms".into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_millis(ms))
}

/// Spinner on stderr while a request is in flight. Hidden in quiet mode
/// and for machine-readable output.
pub fn spinner(global: &GlobalOpts, message: String) -> ProgressBar {
    let machine = !matches!(global.output, OutputFormat::Table);
    if global.quiet || machine {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner().with_style(ProgressStyle::default_spinner());
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
