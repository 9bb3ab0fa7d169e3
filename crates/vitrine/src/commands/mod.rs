//! Command dispatch: bridges CLI args -> core surfaces -> output formatting.

pub mod config_cmd;
pub mod demo;
pub mod list;
pub mod stats;
pub mod surfaces;
pub mod util;
pub mod watch;

use vitrine_api::RestCollectionClient;
use vitrine_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    service: RestCollectionClient,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::List(args) => list::handle(&service, cfg, args, global).await,
        Command::Watch(args) => watch::handle(service, cfg, args, global).await,
        Command::Stats => stats::handle(&service, global).await,
        // Handled before a service is built
        Command::Surfaces | Command::Demo(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Internal("command does not use a service".into()))
        }
    }
}
