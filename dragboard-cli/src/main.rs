use clap::Parser;
use std::process;

mod cli;
mod commands;

use cli::{Cli, Commands};
use dragboard::DragboardConfig;

const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    configure_logging(cli.verbose, cli.debug, cli.quiet);

    let exit_code = match run(cli).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            EXIT_ERROR
        }
    };
    process::exit(exit_code);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Replay { board, script } => {
            let config = match &cli.config {
                Some(path) => DragboardConfig::load_from(path)?,
                None => DragboardConfig::load()?,
            };
            commands::replay::run(&board, &script, config.sync, cli.format).await
        }
        Commands::Check { board } => commands::check::run(&board, cli.format),
    }
}

/// Install the stderr subscriber; stdout carries the report
fn configure_logging(verbose: bool, debug: bool, quiet: bool) {
    use tracing::Level;
    use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

    let log_level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::TRACE
    } else if debug {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dragboard={log_level},{log_level}")));

    registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
