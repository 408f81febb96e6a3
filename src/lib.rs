//! # Photos Album Downloader Library
//!
//! Downloads the media items of a Google Photos album to local disk and keeps
//! a durable ledger of completed files so interrupted runs resume where they
//! stopped.
//!
//! ## Features
//!
//! - **Resumable**: completed filenames are recorded per album in a JSON ledger
//!   and skipped on the next run
//! - **Chunked processing**: items are processed in fixed-size chunks with a
//!   pause between chunks to stay polite with the provider
//! - **Bounded retries**: rate-limited and transport failures are retried with
//!   a freshly resolved download link on every attempt
//! - **Sequential**: one request in flight at a time
//!
//! ## Quick Start
//!
//! ```no_run
//! use photos_album_downloader::downloader::{DownloadDriver, DriverConfig};
//! use photos_album_downloader::fetcher::photos_http::{HttpContentTransfer, PhotosHttpClient};
//! use photos_album_downloader::fetcher::pagination::list_media_items;
//! use photos_album_downloader::resume::ProgressLedger;
//! use std::sync::Arc;
//!
//! # async fn example(access_token: String) -> Result<(), Box<dyn std::error::Error>> {
//! let api = Arc::new(PhotosHttpClient::with_static_token(access_token));
//! let items = list_media_items(api.as_ref(), "ALBUM_ID").await?;
//!
//! let mut ledger = ProgressLedger::load("downloaded_files.json");
//! let driver = DownloadDriver::new(api, Arc::new(HttpContentTransfer::new()), DriverConfig::default());
//! let report = driver
//!     .run(&mut ledger, "ALBUM_ID", &items, "./downloads".as_ref())
//!     .await?;
//! println!("{} of {} files downloaded", report.total_downloaded, report.total_items);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`auth`] - OAuth installed-app flow and per-account token cache
//! - [`fetcher`] - Photos Library API client, pagination and binary transfer
//! - [`downloader`] - Chunked, resumable download driver with retry
//! - [`resume`] - Progress ledger persistence
//! - [`cli`] - Command line arguments and the interactive session
//! - [`shutdown`] - Ctrl+C coordination

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// OAuth authentication and token cache
pub mod auth;

/// CLI arguments and the interactive session
pub mod cli;

/// Resumable download driver
pub mod downloader;

/// Photos Library API access
pub mod fetcher;

/// Download metrics emitted through the `metrics` facade
pub mod metrics;

/// Progress ledger for completed downloads
pub mod resume;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// An album as listed by the provider. Read-only from this crate's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    /// Opaque album identifier
    #[serde(default)]
    pub id: String,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Number of media items, as reported by the provider (string-encoded int64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_items_count: Option<String>,
}

impl Album {
    /// Albums missing an id or a title cannot be selected and are dropped from listings
    pub fn is_listable(&self) -> bool {
        !self.id.is_empty() && !self.title.is_empty()
    }

    /// Parsed item count, if the provider reported one
    pub fn item_count(&self) -> Option<u64> {
        self.media_items_count.as_deref()?.parse().ok()
    }
}

/// A single photo or video record.
///
/// `base_url` is an ephemeral content address. It expires after a while and
/// must be resolved again (see [`MediaItem::download_url`]) before every
/// transfer attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Media item identifier
    pub id: String,
    /// Filename as stored by the provider
    #[serde(default)]
    pub filename: String,
    /// Base content address (not directly downloadable)
    #[serde(default)]
    pub base_url: String,
    /// MIME type, e.g. `image/jpeg`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Provider metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_metadata: Option<MediaMetadata>,
}

/// Metadata attached to a media item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// When the photo or video was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Original width in pixels (string-encoded int64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    /// Original height in pixels (string-encoded int64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    /// Present when the item is a video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<serde_json::Value>,
}

impl MediaItem {
    /// Whether the provider describes this item as a video
    pub fn is_video(&self) -> bool {
        let has_video_metadata = self
            .media_metadata
            .as_ref()
            .is_some_and(|m| m.video.is_some());
        has_video_metadata
            || self
                .mime_type
                .as_deref()
                .is_some_and(|m| m.starts_with("video/"))
    }

    /// Derive the time-limited download link from the base address.
    ///
    /// Photos take the `=d` suffix (original bytes with metadata), videos
    /// `=dv`. Returns `None` when the item carries no base address.
    pub fn download_url(&self) -> Option<String> {
        if self.base_url.is_empty() {
            return None;
        }
        let suffix = if self.is_video() { "=dv" } else { "=d" };
        Some(format!("{}{}", self.base_url, suffix))
    }
}
