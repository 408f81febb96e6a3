//! Page-token pagination for album and media-item listings
//!
//! Every listing endpoint of the Photos Library API returns a
//! `nextPageToken` until the last page. [`page_stream`] turns such an
//! endpoint into a lazy stream of pages; the `list_*` helpers drain it into a
//! single ordered `Vec`.
//!
//! Safety mechanisms:
//! - Maximum page count to prevent endless listings
//! - Repeated page token detection

use crate::fetcher::{FetcherError, FetcherResult, Page, PhotosApi};
use crate::{Album, MediaItem};
use futures_util::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use std::future::Future;
use tracing::{debug, info, warn};

/// Maximum number of pages fetched for one listing
pub const MAX_PAGES: usize = 10_000;

#[derive(Debug, Default)]
struct PageCursor {
    token: Option<String>,
    pages_fetched: usize,
    finished: bool,
    seen_tokens: HashSet<String>,
}

/// Lazily fetch pages until the provider stops returning a page token.
///
/// `fetch_page` receives the token of the page to fetch (`None` for the first
/// page). The stream ends after the first page without a token and yields an
/// error, then ends, on the first failed request.
pub fn page_stream<T, F, Fut>(
    label: &'static str,
    mut fetch_page: F,
) -> impl Stream<Item = FetcherResult<Vec<T>>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = FetcherResult<Page<T>>>,
{
    stream::try_unfold(PageCursor::default(), move |mut cursor| {
        let exceeded = cursor.pages_fetched >= MAX_PAGES;
        let request = (!cursor.finished && !exceeded).then(|| fetch_page(cursor.token.clone()));

        async move {
            if cursor.finished {
                return Ok(None);
            }
            if exceeded {
                return Err(FetcherError::api(format!(
                    "Max pages ({MAX_PAGES}) exceeded while listing {label} - possible endless pagination"
                )));
            }
            let Some(request) = request else {
                return Ok(None);
            };

            debug!(label, page = cursor.pages_fetched + 1, "Fetching page");
            let page = request.await?;
            cursor.pages_fetched += 1;

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => {
                    if !cursor.seen_tokens.insert(token.clone()) {
                        return Err(FetcherError::api(format!(
                            "Repeated page token while listing {label}"
                        )));
                    }
                    cursor.token = Some(token);
                }
                None => {
                    debug!(label, pages = cursor.pages_fetched, "Pagination complete");
                    cursor.finished = true;
                }
            }

            Ok(Some((page.items, cursor)))
        }
    })
}

/// Drain a page stream into one ordered list, reporting the running count
/// after every page.
pub async fn collect_pages<T, S>(pages: S, mut on_progress: impl FnMut(usize)) -> FetcherResult<Vec<T>>
where
    S: Stream<Item = FetcherResult<Vec<T>>>,
{
    let mut pages = std::pin::pin!(pages);
    let mut all_items = Vec::new();
    while let Some(page) = pages.try_next().await? {
        all_items.extend(page);
        on_progress(all_items.len());
    }
    Ok(all_items)
}

/// List every album the user can see, dropping entries without id or title
pub async fn list_albums<A>(api: &A) -> FetcherResult<Vec<Album>>
where
    A: PhotosApi + ?Sized,
{
    let pages = page_stream("albums", move |token| async move {
        api.list_albums_page(token.as_deref()).await
    });
    let albums: Vec<Album> = collect_pages(pages, |_| {})
        .await?
        .into_iter()
        .filter(|album| {
            let listable = album.is_listable();
            if !listable {
                debug!(album_id = %album.id, "Dropping album without id or title");
            }
            listable
        })
        .collect();

    if albums.is_empty() {
        warn!("No albums found or accessible");
    } else {
        info!(count = albums.len(), "Listed albums");
    }
    Ok(albums)
}

/// Lazy page stream over the media items of `album_id`
pub fn media_item_pages<'a, A>(
    api: &'a A,
    album_id: &'a str,
) -> impl Stream<Item = FetcherResult<Vec<MediaItem>>> + 'a
where
    A: PhotosApi + ?Sized,
{
    page_stream("media items", move |token| async move {
        api.search_media_items_page(album_id, token.as_deref()).await
    })
}

/// Every media item of `album_id`, in provider order
pub async fn list_media_items<A>(api: &A, album_id: &str) -> FetcherResult<Vec<MediaItem>>
where
    A: PhotosApi + ?Sized,
{
    list_media_items_with_progress(api, album_id, |_| {}).await
}

/// Like [`list_media_items`], calling `on_progress` with the running item
/// count after each page
pub async fn list_media_items_with_progress<A>(
    api: &A,
    album_id: &str,
    on_progress: impl FnMut(usize),
) -> FetcherResult<Vec<MediaItem>>
where
    A: PhotosApi + ?Sized,
{
    let items = collect_pages(media_item_pages(api, album_id), on_progress).await?;
    info!(album_id, count = items.len(), "Listed media items");
    Ok(items)
}
