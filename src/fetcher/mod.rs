//! Photos Library API access
//!
//! The download driver talks to the provider through two narrow traits:
//! [`PhotosApi`] for metadata (albums, media items, link resolution) and
//! [`ContentTransfer`] for binary downloads. [`photos_http`] implements both
//! over HTTP; tests substitute in-memory fakes.

use crate::{Album, MediaItem};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

pub mod pagination;
pub mod photos_http;
pub mod shared_resources;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Access token rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// API error response
    #[error("API error (HTTP {status}): {message}")]
    ApiError {
        /// HTTP status code, 0 when the error did not come from a response
        status: u16,
        /// Error message from the provider
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),
}

impl FetcherError {
    /// An API error that did not originate from an HTTP response
    pub fn api(message: impl Into<String>) -> Self {
        Self::ApiError {
            status: 0,
            message: message.into(),
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// One page of a paged listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page, in provider order
    pub items: Vec<T>,
    /// Token for the next page; `None` on the last page
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Final page with the given items
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }
}

/// Album and media-item metadata operations
#[async_trait]
pub trait PhotosApi: Send + Sync {
    /// Fetch one page of the user's albums
    async fn list_albums_page(&self, page_token: Option<&str>) -> FetcherResult<Page<Album>>;

    /// Fetch a single album
    async fn get_album(&self, album_id: &str) -> FetcherResult<Album>;

    /// Fetch one page of the media items in `album_id`
    async fn search_media_items_page(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> FetcherResult<Page<MediaItem>>;

    /// Fetch a single media item with a fresh base address
    async fn get_media_item(&self, media_item_id: &str) -> FetcherResult<MediaItem>;

    /// Resolve a fresh, time-limited download link for a media item
    async fn resolve_download_url(&self, media_item_id: &str) -> FetcherResult<String> {
        let item = self.get_media_item(media_item_id).await?;
        item.download_url().ok_or_else(|| {
            FetcherError::ParseError(format!("media item {media_item_id} has no baseUrl"))
        })
    }
}

/// Response of a binary transfer
#[derive(Debug, Clone)]
pub struct TransferResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response body; only meaningful for `200 OK`
    pub body: Bytes,
}

/// Binary content download
#[async_trait]
pub trait ContentTransfer: Send + Sync {
    /// Fetch `url`. Any HTTP status is a successful call; only transport
    /// failures return [`FetcherError::NetworkError`].
    async fn fetch(&self, url: &str) -> FetcherResult<TransferResponse>;
}
