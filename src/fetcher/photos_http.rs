//! HTTP implementation of the Photos Library API and content transfer
//!
//! Provides:
//! - [`PhotosHttpClient`]: bearer-authenticated JSON requests against the
//!   Photos Library REST API, implementing [`PhotosApi`]
//! - [`HttpContentTransfer`]: plain GET of resolved download links,
//!   implementing [`ContentTransfer`]
//!
//! The metadata client does not retry: listing and link-resolution failures
//! are reported to the caller, which decides what is fatal.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::downloader::config::{ALBUM_PAGE_SIZE, MEDIA_PAGE_SIZE};
use crate::fetcher::shared_resources::global_http_client;
use crate::fetcher::{
    ContentTransfer, FetcherError, FetcherResult, Page, PhotosApi, TransferResponse,
};
use crate::{Album, MediaItem};

/// Photos Library API root
pub const PHOTOS_API_BASE_URL: &str = "https://photoslibrary.googleapis.com/v1";

/// Source of bearer tokens for API requests.
///
/// Implementations may refresh the token before returning it; the HTTP
/// client asks for a token on every request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently valid access token
    async fn access_token(&self) -> FetcherResult<String>;
}

/// A fixed access token that is never refreshed
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap an access token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> FetcherResult<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumsResponse {
    #[serde(default)]
    albums: Vec<Album>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaItemsResponse {
    #[serde(default)]
    media_items: Vec<MediaItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchMediaItemsRequest<'a> {
    album_id: &'a str,
    page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Bearer-authenticated client for the Photos Library REST API
pub struct PhotosHttpClient {
    client: Arc<Client>,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl PhotosHttpClient {
    /// Client against the production API using the shared HTTP client
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_base_url(global_http_client(), PHOTOS_API_BASE_URL, tokens)
    }

    /// Client with a fixed access token
    pub fn with_static_token(access_token: impl Into<String>) -> Self {
        Self::new(Arc::new(StaticToken::new(access_token)))
    }

    /// Client against a custom API root (used by tests)
    pub fn with_base_url(
        client: Arc<Client>,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T>(&self, endpoint: &str, params: &[(&str, String)]) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let token = self.tokens.access_token().await?;
        debug!(url = %url, params = params.len(), "GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;
        Self::handle_response(response).await
    }

    async fn post_json<T, B>(&self, endpoint: &str, body: &B) -> FetcherResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let token = self.tokens.access_token().await?;
        debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;
        Self::handle_response(response).await
    }

    /// Map the response status to a [`FetcherError`] or deserialize the body
    async fn handle_response<T>(response: Response) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| FetcherError::ParseError(format!("Failed to deserialize response: {e}")));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = error_message(&body);
        warn!(status = status.as_u16(), message = %message, "Photos API request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => FetcherError::Unauthorized(message),
            StatusCode::TOO_MANY_REQUESTS => FetcherError::RateLimitExceeded,
            _ => FetcherError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// Pull the human-readable message out of a Google API error body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) if !envelope.error.message.is_empty() => {
                format!("{status}: {}", envelope.error.message)
            }
            Some(status) => status,
            None => envelope.error.message,
        },
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl PhotosApi for PhotosHttpClient {
    async fn list_albums_page(&self, page_token: Option<&str>) -> FetcherResult<Page<Album>> {
        let mut params = vec![("pageSize", ALBUM_PAGE_SIZE.to_string())];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        let response: AlbumsResponse = self.get_json("/albums", &params).await?;
        Ok(Page {
            items: response.albums,
            next_page_token: response.next_page_token,
        })
    }

    async fn get_album(&self, album_id: &str) -> FetcherResult<Album> {
        self.get_json(&format!("/albums/{album_id}"), &[]).await
    }

    async fn search_media_items_page(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> FetcherResult<Page<MediaItem>> {
        let request = SearchMediaItemsRequest {
            album_id,
            page_size: MEDIA_PAGE_SIZE,
            page_token,
        };
        let response: MediaItemsResponse = self.post_json("/mediaItems:search", &request).await?;
        Ok(Page {
            items: response.media_items,
            next_page_token: response.next_page_token,
        })
    }

    async fn get_media_item(&self, media_item_id: &str) -> FetcherResult<MediaItem> {
        self.get_json(&format!("/mediaItems/{media_item_id}"), &[]).await
    }
}

/// Downloads resolved content links with a plain GET
pub struct HttpContentTransfer {
    client: Arc<Client>,
}

impl HttpContentTransfer {
    /// Transfer using the shared HTTP client
    pub fn new() -> Self {
        Self::with_client(global_http_client())
    }

    /// Transfer using a specific HTTP client
    pub fn with_client(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Default for HttpContentTransfer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentTransfer for HttpContentTransfer {
    async fn fetch(&self, url: &str) -> FetcherResult<TransferResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Ok(TransferResponse {
                status,
                body: bytes::Bytes::new(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetcherError::NetworkError(format!("Failed to read body: {e}")))?;
        debug!(status = status.as_u16(), bytes = body.len(), "Transfer complete");
        Ok(TransferResponse { status, body })
    }
}
