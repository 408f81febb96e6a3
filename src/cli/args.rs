//! Command line arguments

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::CREDENTIALS_FILENAME;
use crate::downloader::config::{DriverConfig, BATCH_SIZE};
use crate::resume::LEDGER_FILENAME;

/// Largest accepted chunk size
const MAX_BATCH_SIZE: usize = 10_000;

/// Parse and validate the chunk size
fn parse_batch_size(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("batch size must be at least 1".to_string());
    }
    if value > MAX_BATCH_SIZE {
        return Err(format!(
            "batch size {value} exceeds maximum of {MAX_BATCH_SIZE}"
        ));
    }
    Ok(value)
}

/// Google Photos Album Downloader CLI
///
/// Runs interactively: asks for the account, lists its albums and downloads
/// the chosen one. Flags only tune the run.
#[derive(Parser, Debug, Clone)]
#[command(name = "photos-album-downloader")]
#[command(about = "Download a Google Photos album to local disk, resuming where the last run stopped", long_about = None)]
#[command(version)]
pub struct Cli {
    /// OAuth client secrets file downloaded from Google Cloud Console
    #[arg(long, default_value = CREDENTIALS_FILENAME)]
    pub credentials: PathBuf,

    /// Directory holding the per-account token cache files
    #[arg(long, default_value = ".")]
    pub token_dir: PathBuf,

    /// Progress ledger recording downloaded files per album
    #[arg(long, default_value = LEDGER_FILENAME)]
    pub ledger: PathBuf,

    /// Media items processed per batch before pausing (range: 1-10000)
    #[arg(long, default_value_t = BATCH_SIZE, value_parser = parse_batch_size)]
    pub batch_size: usize,

    /// Download attempts per media item (range: 1-20)
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub retry_count: u32,

    /// Wait before retrying a rate-limited download, in milliseconds
    #[arg(long, default_value = "1000")]
    pub retry_delay_ms: u64,

    /// Pause between batches, in milliseconds
    #[arg(long, default_value = "5000")]
    pub chunk_pause_ms: u64,

    /// Account email; asked interactively when omitted
    #[arg(long)]
    pub email: Option<String>,

    /// Check that the ledger file is readable and exit
    #[arg(long, default_value_t = false)]
    pub verify_ledger: bool,
}

impl Cli {
    /// Driver configuration from the tuning flags
    pub fn driver_config(&self, show_progress: bool) -> DriverConfig {
        DriverConfig::default()
            .with_batch_size(self.batch_size)
            .with_retry_count(self.retry_count)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_chunk_pause(Duration::from_millis(self.chunk_pause_ms))
            .with_progress(show_progress)
    }
}
