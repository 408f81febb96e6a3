//! Main entry point for the photos-album-downloader CLI

use clap::Parser;
use photos_album_downloader::cli::{
    verify_ledger, Cli, CliError, Prompter, Session, SessionConfig, TROUBLESHOOTING_HINTS,
};
use photos_album_downloader::shutdown::{self, ShutdownCoordinator};
use std::io::{BufReader, IsTerminal};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("photos_album_downloader=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_cancelled() {
    println!("\nOperation cancelled by user");
}

#[tokio::main]
async fn main() {
    init_tracing();
    photos_album_downloader::metrics::describe_metrics();

    let cli = Cli::parse();

    if cli.verify_ledger {
        if let Err(e) = verify_ledger(&cli.ledger, &mut std::io::stdout()) {
            error!("Ledger verification failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // First Ctrl+C stops after the current item; a second one exits at once,
    // e.g. while a prompt is waiting for input.
    let shutdown = ShutdownCoordinator::shared();
    shutdown::set_global_shutdown(shutdown.clone());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - stopping after the current item...");
                shutdown.request_shutdown();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                print_cancelled();
                std::process::exit(0);
            }
        }
    });

    let show_progress = std::io::stdout().is_terminal();
    let config = SessionConfig::from_cli(&cli, show_progress);
    let prompter = Prompter::new(BufReader::new(std::io::stdin()), std::io::stdout());
    let mut session = Session::new(config, prompter, shutdown.clone());

    match session.run().await.map_err(anyhow::Error::from) {
        Ok(Some(report)) if report.interrupted => print_cancelled(),
        Ok(_) => {}
        Err(e) => {
            let cancelled = e
                .downcast_ref::<CliError>()
                .is_some_and(CliError::is_cancellation);
            if cancelled || shutdown.is_shutdown_requested() {
                print_cancelled();
                return;
            }
            error!("Session failed: {:#}", e);
            println!("An error occurred: {e}");
            for line in TROUBLESHOOTING_HINTS {
                println!("{line}");
            }
            std::process::exit(1);
        }
    }
}
