//! Download configuration constants

use std::path::PathBuf;
use std::time::Duration;

/// Number of media items processed per chunk.
/// Bounds the burst of requests between two pauses.
pub const BATCH_SIZE: usize = 500;

/// Transfer attempts per media item before it is marked failed.
pub const RETRY_COUNT: u32 = 3;

/// Wait before retrying a rate-limited (403/429) transfer.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Pause after each chunk before starting the next one.
pub const CHUNK_PAUSE: Duration = Duration::from_secs(5);

/// Page size for album listings (API maximum is 50).
pub const ALBUM_PAGE_SIZE: usize = 50;

/// Page size for media-item searches (API maximum is 100).
pub const MEDIA_PAGE_SIZE: usize = 100;

/// Default output directory offered by the interactive prompt.
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// Tunables of the download driver
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Items per chunk, at least 1
    pub batch_size: usize,
    /// Transfer attempts per item, at least 1
    pub retry_count: u32,
    /// Wait before retrying a rate-limited transfer
    pub retry_delay: Duration,
    /// Pause between chunks
    pub chunk_pause: Duration,
    /// Draw an indicatif progress bar while downloading
    pub show_progress: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            retry_count: RETRY_COUNT,
            retry_delay: RETRY_DELAY,
            chunk_pause: CHUNK_PAUSE,
            show_progress: false,
        }
    }
}

impl DriverConfig {
    /// Set the chunk size (clamped to at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the attempt ceiling (clamped to at least 1)
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count.max(1);
        self
    }

    /// Set the rate-limit retry delay
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Set the pause between chunks
    pub fn with_chunk_pause(mut self, chunk_pause: Duration) -> Self {
        self.chunk_pause = chunk_pause;
        self
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Number of chunks needed for `total_items`
    pub fn chunk_count(&self, total_items: usize) -> usize {
        total_items.div_ceil(self.batch_size.max(1))
    }
}

/// Resolved output location for an album download
pub fn output_dir_or_default(input: &str) -> PathBuf {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        PathBuf::from(DEFAULT_OUTPUT_DIR)
    } else {
        PathBuf::from(trimmed)
    }
}
