//! hvc - Command-line host for Home Ventilation Control appliances.
//!
//! Discovers appliances on the local network, reads their state documents,
//! sends commands and keeps sessions alive from a terminal or script.

mod cli;
mod commands;
mod error;
mod output;
mod storage;
mod target;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::Context;
use error::{exit_codes, CliError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::from(&cli);

    match cli.command {
        Commands::Discover(args) => commands::run_discover(args, &ctx).await,
        Commands::Status(args) => commands::run_status(args, &ctx).await,
        Commands::Get(args) => commands::run_get(args, &ctx).await,
        Commands::Send(args) => commands::run_send(args, &ctx).await,
        Commands::Fan(args) => commands::run_fan(args, &ctx).await,
        Commands::Watch(args) => commands::run_watch(args, &ctx).await,
        Commands::Devices(args) => commands::run_devices(args, &ctx).await,
    }
}
