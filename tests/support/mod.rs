//! In-memory fakes of the Photos API and content transfer

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use photos_album_downloader::fetcher::{
    ContentTransfer, FetcherError, FetcherResult, Page, PhotosApi, TransferResponse,
};
use photos_album_downloader::shutdown::SharedShutdown;
use photos_album_downloader::{Album, MediaItem};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const MEDIA_HOST: &str = "https://media.test";

/// A photo whose download link is `https://media.test/<id>=d`
pub fn photo(id: &str, filename: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        filename: filename.to_string(),
        base_url: format!("{MEDIA_HOST}/{id}"),
        mime_type: Some("image/jpeg".to_string()),
        media_metadata: None,
    }
}

/// `n` photos named `IMG_0000.jpg`, `IMG_0001.jpg`, ...
pub fn photos(n: usize) -> Vec<MediaItem> {
    (0..n)
        .map(|i| photo(&format!("id-{i}"), &format!("IMG_{i:04}.jpg")))
        .collect()
}

pub fn download_url(id: &str) -> String {
    format!("{MEDIA_HOST}/{id}=d")
}

pub fn album(id: &str, title: &str) -> Album {
    Album {
        id: id.to_string(),
        title: title.to_string(),
        media_items_count: None,
    }
}

/// Photos API backed by fixed data, counting calls
#[derive(Default)]
pub struct FakeApi {
    pub albums: Vec<Album>,
    pub media_pages: Vec<Vec<MediaItem>>,
    pub unresolvable: HashSet<String>,
    pub resolve_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl FakeApi {
    pub fn with_items(items: Vec<MediaItem>) -> Self {
        Self {
            media_pages: vec![items],
            ..Self::default()
        }
    }

    pub fn resolve_count(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn all_items(&self) -> impl Iterator<Item = &MediaItem> {
        self.media_pages.iter().flatten()
    }
}

#[async_trait]
impl PhotosApi for FakeApi {
    async fn list_albums_page(&self, _page_token: Option<&str>) -> FetcherResult<Page<Album>> {
        Ok(Page::last(self.albums.clone()))
    }

    async fn get_album(&self, album_id: &str) -> FetcherResult<Album> {
        self.albums
            .iter()
            .find(|a| a.id == album_id)
            .cloned()
            .ok_or_else(|| FetcherError::ApiError {
                status: 404,
                message: format!("album {album_id} not found"),
            })
    }

    async fn search_media_items_page(
        &self,
        _album_id: &str,
        page_token: Option<&str>,
    ) -> FetcherResult<Page<MediaItem>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let index = page_token
            .map_or(Ok(0), |t| t.parse::<usize>())
            .map_err(|_| FetcherError::ParseError("bad page token".to_string()))?;
        let items = self.media_pages.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < self.media_pages.len()).then(|| (index + 1).to_string());
        Ok(Page {
            items,
            next_page_token,
        })
    }

    async fn get_media_item(&self, media_item_id: &str) -> FetcherResult<MediaItem> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.unresolvable.contains(media_item_id) {
            return Err(FetcherError::ApiError {
                status: 404,
                message: "NOT_FOUND".to_string(),
            });
        }
        self.all_items()
            .find(|i| i.id == media_item_id)
            .cloned()
            .ok_or_else(|| FetcherError::ApiError {
                status: 404,
                message: format!("media item {media_item_id} not found"),
            })
    }
}

/// Scripted outcome of one transfer call
#[derive(Debug, Clone)]
pub enum Outcome {
    Ok(&'static [u8]),
    Status(u16),
    Transport,
}

/// Content transfer answering from per-URL scripts.
///
/// Each call pops the next scripted outcome for the URL; once a script is
/// exhausted (or absent) the call succeeds with the default body.
pub struct FakeTransfer {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    urls: Mutex<Vec<String>>,
    calls: AtomicUsize,
    shutdown_on_fetch: Option<SharedShutdown>,
}

pub const DEFAULT_BODY: &[u8] = b"jpeg-bytes";

impl FakeTransfer {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            urls: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            shutdown_on_fetch: None,
        }
    }

    /// Request `shutdown` from inside every fetch, as a Ctrl+C mid-transfer would
    pub fn requesting_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown_on_fetch = Some(shutdown);
        self
    }

    pub fn script(self, url: String, outcomes: Vec<Outcome>) -> Self {
        self.scripts.lock().unwrap().insert(url, outcomes.into());
        self
    }

    /// Every call to `url` answers with `status`
    pub fn always(self, url: String, status: u16) -> Self {
        self.script(url, vec![Outcome::Status(status); 100])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentTransfer for FakeTransfer {
    async fn fetch(&self, url: &str) -> FetcherResult<TransferResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        if let Some(shutdown) = &self.shutdown_on_fetch {
            shutdown.request_shutdown();
        }

        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Outcome::Ok(DEFAULT_BODY));

        match outcome {
            Outcome::Ok(body) => Ok(TransferResponse {
                status: StatusCode::OK,
                body: Bytes::from_static(body),
            }),
            Outcome::Status(code) => Ok(TransferResponse {
                status: StatusCode::from_u16(code).unwrap(),
                body: Bytes::new(),
            }),
            Outcome::Transport => Err(FetcherError::NetworkError("connection reset".to_string())),
        }
    }
}
