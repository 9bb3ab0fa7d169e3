//! `vitrine list`: one fetch, no feed, no carousel.

use tracing::debug;

use vitrine_api::RestCollectionClient;
use vitrine_config::Config;
use vitrine_core::Surface;

use crate::cli::{GlobalOpts, ListArgs};
use crate::commands::util::{self, ItemRow};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    service: &RestCollectionClient,
    cfg: &Config,
    args: ListArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut surface = vitrine_config::surface_config(cfg, &args.surface)?;
    if args.limit.is_some() {
        surface.limit = args.limit;
    }
    let filter = util::resolve_filter(args.filter.as_deref(), &surface)?;
    debug!(surface = %surface.name, %filter, "listing");

    let spinner = util::spinner(global, format!("Fetching {}...", surface.collection));
    let result = Surface::fetch_once(service, &surface, filter).await;
    spinner.finish_and_clear();
    let items = result?;

    let out = output::render_list(
        &global.output,
        &items,
        |item| ItemRow::from(item),
        |item| item.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
