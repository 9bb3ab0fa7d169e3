//! `vitrine surfaces`: presets plus anything under `[surfaces.*]`.

use serde::Serialize;
use tabled::Tabled;

use vitrine_config::Config;
use vitrine_core::{Category, Filter, SurfaceConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct SurfaceInfo {
    name: String,
    collection: String,
    order: String,
    limit: Option<usize>,
    /// Fixed predicate, e.g. the category of a category page.
    scope: Option<String>,
    /// Filters a viewer may select besides `all`.
    filters: Vec<String>,
    filter: String,
    autoplay: bool,
    autoplay_interval_ms: u128,
    live: bool,
    /// `preset`, `configured`, or `preset+configured`.
    source: &'static str,
}

#[derive(Tabled)]
struct SurfaceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Collection")]
    collection: String,
    #[tabled(rename = "Order")]
    order: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Filter")]
    filter: String,
    #[tabled(rename = "Autoplay")]
    autoplay: String,
    #[tabled(rename = "Live")]
    live: String,
    #[tabled(rename = "Source")]
    source: &'static str,
}

impl From<&SurfaceInfo> for SurfaceRow {
    fn from(s: &SurfaceInfo) -> Self {
        Self {
            name: s.name.clone(),
            collection: s.collection.clone(),
            order: match s.limit {
                Some(limit) => format!("{} (first {limit})", s.order),
                None => s.order.clone(),
            },
            scope: s.scope.clone().unwrap_or_else(|| "-".into()),
            filter: s.filter.clone(),
            autoplay: if s.autoplay {
                format!("{}ms", s.autoplay_interval_ms)
            } else {
                "off".into()
            },
            live: if s.live { "yes" } else { "no" }.into(),
            source: s.source,
        }
    }
}

fn info(surface: &SurfaceConfig, source: &'static str) -> SurfaceInfo {
    SurfaceInfo {
        name: surface.name.clone(),
        collection: surface.collection.clone(),
        order: format!("{}.{}", surface.order.field, surface.order.direction),
        limit: surface.limit,
        scope: (surface.scope != Filter::All).then(|| surface.scope.to_string()),
        filters: surface.filters.iter().map(ToString::to_string).collect(),
        filter: surface.initial_filter.to_string(),
        autoplay: surface.autoplay,
        autoplay_interval_ms: surface.autoplay_interval.as_millis(),
        live: surface.live,
        source,
    }
}

/// Every surface name the CLI accepts, resolved against `cfg`.
fn known_surfaces(cfg: &Config) -> Result<Vec<SurfaceInfo>, CliError> {
    let mut names: Vec<String> = SurfaceConfig::PRESETS.iter().map(|&n| n.to_owned()).collect();
    names.extend(Category::all().map(|c| format!("category:{}", c.slug())));
    let preset_count = names.len();

    let mut configured: Vec<&String> = cfg
        .surfaces
        .keys()
        .filter(|name| !names.contains(name))
        .collect();
    configured.sort();
    names.extend(configured.into_iter().cloned());

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let surface = vitrine_config::surface_config(cfg, name)?;
            let source = match (i < preset_count, cfg.surfaces.contains_key(name)) {
                (true, false) => "preset",
                (true, true) => "preset+configured",
                (false, _) => "configured",
            };
            Ok(info(&surface, source))
        })
        .collect()
}

pub fn handle(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let surfaces = known_surfaces(cfg)?;
    let out = output::render_list(
        &global.output,
        &surfaces,
        |s| SurfaceRow::from(s),
        |s| s.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
