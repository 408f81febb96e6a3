//! Unit tests for album and media-item pagination

use std::sync::atomic::Ordering;

use futures_util::TryStreamExt;
use photos_album_downloader::fetcher::pagination::{
    list_albums, list_media_items, list_media_items_with_progress, media_item_pages,
};

use crate::support::{album, photo, photos, FakeApi};

#[tokio::test]
async fn test_pages_concatenate_in_order() {
    let api = FakeApi {
        media_pages: vec![
            vec![photo("1", "a.jpg"), photo("2", "b.jpg")],
            vec![photo("3", "c.jpg")],
            vec![photo("4", "d.jpg"), photo("5", "e.jpg")],
        ],
        ..FakeApi::default()
    };

    let items = list_media_items(&api, "album").await.unwrap();

    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(api.search_calls.load(Ordering::SeqCst), 3, "stops at missing token");
}

#[tokio::test]
async fn test_progress_reports_running_count() {
    let api = FakeApi {
        media_pages: vec![photos(100), photos(100), photos(37)],
        ..FakeApi::default()
    };

    let mut seen = Vec::new();
    let items = list_media_items_with_progress(&api, "album", |count| seen.push(count))
        .await
        .unwrap();

    assert_eq!(items.len(), 237);
    assert_eq!(seen, vec![100, 200, 237]);
}

#[tokio::test]
async fn test_lazy_stream_fetches_on_demand() {
    let api = FakeApi {
        media_pages: vec![photos(2), photos(2), photos(2)],
        ..FakeApi::default()
    };

    let pages = media_item_pages(&api, "album");
    let mut pages = std::pin::pin!(pages);
    let first = pages.try_next().await.unwrap().unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(api.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_albums_without_title_dropped() {
    let api = FakeApi {
        albums: vec![album("a1", "Holidays"), album("a2", ""), album("", "Orphan")],
        ..FakeApi::default()
    };

    let albums = list_albums(&api).await.unwrap();
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].title, "Holidays");
}

#[tokio::test]
async fn test_no_albums_is_empty_list() {
    let albums = list_albums(&FakeApi::default()).await.unwrap();
    assert!(albums.is_empty());
}
