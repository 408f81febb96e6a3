//! Per-item state and the end-of-run report

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a media item within one run.
///
/// `Pending -> Skipped` or `Pending -> Downloading -> Done | Failed`. Terminal
/// states never change within a run; only `Done` survives across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemState {
    /// Not processed yet
    Pending,
    /// Already listed in the ledger
    Skipped,
    /// Transfer in progress
    Downloading {
        /// Attempt number (1-based)
        attempt: u32,
    },
    /// Written to disk
    Done {
        /// Attempts used
        attempts: u32,
    },
    /// Gave up on this item for the current run
    Failed(FailureReason),
}

impl ItemState {
    /// Whether the item reached a state it will not leave in this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Done { .. } | Self::Failed(_))
    }
}

/// Why an item ended up failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Filename empty or not a plain file name
    InvalidFilename,
    /// A fresh download link could not be obtained
    LinkResolution(String),
    /// Still rate-limited (403/429) after every attempt
    RateLimited {
        /// Attempts made
        attempts: u32,
    },
    /// Non-success status other than 403/429
    HttpStatus(u16),
    /// Transport errors on every attempt
    Transport {
        /// Attempts made
        attempts: u32,
        /// Last transport error
        message: String,
    },
    /// The response could not be written to the output directory
    Write(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilename => write!(f, "invalid filename"),
            Self::LinkResolution(e) => write!(f, "could not resolve download link: {e}"),
            Self::RateLimited { attempts } => {
                write!(f, "rate limited after {attempts} attempts")
            }
            Self::HttpStatus(status) => write!(f, "HTTP {status}"),
            Self::Transport { attempts, message } => {
                write!(f, "transport error after {attempts} attempts: {message}")
            }
            Self::Write(e) => write!(f, "write failed: {e}"),
        }
    }
}

/// A failed item as listed in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Media item id
    pub media_item_id: String,
    /// Provider filename
    pub filename: String,
    /// Failure cause
    pub reason: FailureReason,
}

/// Summary of one driver run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Album processed
    pub album_id: String,
    /// Items found in the album
    pub total_items: usize,
    /// Chunks started
    pub chunks: usize,
    /// Items written during this run
    pub downloaded: usize,
    /// Items skipped because the ledger already had them
    pub skipped: usize,
    /// Items that failed during this run
    pub failed: usize,
    /// Files known downloaded for the album at the end of the run,
    /// including earlier runs
    pub total_downloaded: usize,
    /// Transfer calls issued
    pub transfer_attempts: u64,
    /// The run stopped early on a shutdown request
    pub interrupted: bool,
    /// Failed items with their causes
    pub failures: Vec<ItemFailure>,
}

impl DownloadReport {
    /// Start a report for `album_id`
    pub fn new(album_id: &str, total_items: usize) -> Self {
        Self {
            album_id: album_id.to_string(),
            total_items,
            ..Self::default()
        }
    }

    /// Fold a terminal item state into the counters
    pub fn record(&mut self, media_item_id: &str, filename: &str, state: &ItemState) {
        match state {
            ItemState::Skipped => self.skipped += 1,
            ItemState::Done { .. } => self.downloaded += 1,
            ItemState::Failed(reason) => {
                self.failed += 1;
                self.failures.push(ItemFailure {
                    media_item_id: media_item_id.to_string(),
                    filename: filename.to_string(),
                    reason: reason.clone(),
                });
            }
            ItemState::Pending | ItemState::Downloading { .. } => {}
        }
    }

    /// Items that reached a terminal state
    pub fn processed(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }
}
