mod cli;
mod config;
mod context;
mod error;
mod local;
mod mount;
mod prompt;
mod remote;
mod transfer;
pub mod utils;

use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use error::ShipError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.verbosity().log_directive().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.execute(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(ShipError::Aborted) => {
            eprintln!();
            eprintln!("  {}", style("Cancelled.").dim());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("  {} {}", style("✕").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
