//! Chunked, resumable album downloads
//!
//! This module drives the download of one album's media items with skip-by-
//! ledger, bounded retry and a courtesy pause between chunks.
//!
//! # Overview
//!
//! 1. **Configuration**: Tune chunk size, retries and pauses with [`config::DriverConfig`]
//! 2. **Execution**: Run an album through [`driver::DownloadDriver`]
//! 3. **Item Tracking**: Each item ends [`item::ItemState::Skipped`], `Done` or `Failed`
//! 4. **Progress**: Chunk headers and summaries via [`progress::ChunkProgress`]
//! 5. **Resume Support**: Completed files are recorded in the [`crate::resume::ProgressLedger`]
//!
//! # Quick Start
//!
//! ```no_run
//! use photos_album_downloader::downloader::{DownloadDriver, DriverConfig};
//! use photos_album_downloader::fetcher::photos_http::{HttpContentTransfer, PhotosHttpClient};
//! use photos_album_downloader::resume::ProgressLedger;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(items: Vec<photos_album_downloader::MediaItem>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = DriverConfig::default()
//!     .with_batch_size(200)
//!     .with_chunk_pause(Duration::from_secs(10));
//! let driver = DownloadDriver::new(
//!     Arc::new(PhotosHttpClient::with_static_token("token".to_string())),
//!     Arc::new(HttpContentTransfer::new()),
//!     config,
//! );
//!
//! let mut ledger = ProgressLedger::load("downloaded_files.json");
//! let report = driver.run(&mut ledger, "ALBUM_ID", &items, "./downloads".as_ref()).await?;
//! println!("{} failed", report.failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Per-item failures never abort a run; they end up in
//! [`item::DownloadReport::failures`]. `run` only returns a [`DownloadError`]
//! when the output directory cannot be used.

pub mod config;
pub mod driver;
pub mod item;
pub mod progress;

pub use config::DriverConfig;
pub use driver::DownloadDriver;
pub use item::{DownloadReport, FailureReason, ItemFailure, ItemState};

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Validation error
    #[error("validation error: {0}")]
    ValidationError(String),
}
