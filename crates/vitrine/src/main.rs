mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "vitrine", &mut std::io::stdout());
            Ok(())
        }

        // Runs against an in-memory collection, no service needed
        Command::Demo(args) => commands::demo::handle(args, &cli.global).await,

        Command::Surfaces => {
            let cfg = config::load(&cli.global)?;
            commands::surfaces::handle(&cfg, &cli.global)
        }

        cmd => {
            let cfg = config::load(&cli.global)?;
            let service = config::service_config(&cli.global, &cfg)?.build_client()?;

            tracing::debug!(command = ?cmd, url = %service.rest_base(), "dispatching command");
            commands::dispatch(cmd, service, &cfg, &cli.global).await
        }
    }
}
