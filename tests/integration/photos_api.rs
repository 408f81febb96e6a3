//! Integration tests for the HTTP Photos API client and content transfer

use std::sync::Arc;

use photos_album_downloader::fetcher::pagination::{list_albums, list_media_items};
use photos_album_downloader::fetcher::photos_http::{
    HttpContentTransfer, PhotosHttpClient, StaticToken,
};
use photos_album_downloader::fetcher::{ContentTransfer, FetcherError, PhotosApi};
use reqwest::{Client, StatusCode};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> PhotosHttpClient {
    PhotosHttpClient::with_base_url(
        Arc::new(Client::new()),
        format!("{}/v1", server.uri()),
        Arc::new(StaticToken::new("test-token")),
    )
}

#[tokio::test]
async fn test_list_albums_follows_page_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums"))
        .and(query_param("pageSize", "50"))
        .and(query_param("pageToken", "p2"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "albums": [{"id": "a3", "title": "Wedding", "mediaItemsCount": "120"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/albums"))
        .and(query_param("pageSize", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "albums": [
                {"id": "a1", "title": "Holidays"},
                {"id": "a2"}
            ],
            "nextPageToken": "p2"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let albums = list_albums(&client_for(&server)).await.unwrap();

    let ids: Vec<&str> = albums.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a3"], "untitled album dropped, order kept");
    assert_eq!(albums[1].item_count(), Some(120));
}

#[tokio::test]
async fn test_search_media_items_posts_album_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/mediaItems:search"))
        .and(body_json(json!({"albumId": "a1", "pageSize": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mediaItems": [
                {"id": "m1", "filename": "one.jpg", "baseUrl": "https://lh3/one", "mimeType": "image/jpeg"},
                {"id": "m2", "filename": "two.mp4", "baseUrl": "https://lh3/two", "mimeType": "video/mp4",
                 "mediaMetadata": {"video": {"status": "READY"}}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = list_media_items(&client_for(&server), "a1").await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].filename, "one.jpg");
    assert!(items[1].is_video());
}

#[tokio::test]
async fn test_empty_search_response_is_empty_album() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/mediaItems:search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let items = list_media_items(&client_for(&server), "empty").await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_resolve_download_url_uses_fresh_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/mediaItems/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m1", "filename": "one.jpg", "baseUrl": "https://lh3/fresh", "mimeType": "image/jpeg"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.resolve_download_url("m1").await.unwrap(), "https://lh3/fresh=d");
    assert_eq!(client.resolve_download_url("m1").await.unwrap(), "https://lh3/fresh=d");
}

#[tokio::test]
async fn test_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/unauthorized"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "Invalid Credentials", "status": "UNAUTHENTICATED"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/throttled"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.get_album("unauthorized").await {
        Err(FetcherError::Unauthorized(message)) => {
            assert_eq!(message, "UNAUTHENTICATED: Invalid Credentials")
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
    assert!(matches!(
        client.get_album("throttled").await,
        Err(FetcherError::RateLimitExceeded)
    ));
    assert!(matches!(
        client.get_album("broken").await,
        Err(FetcherError::ApiError { status: 500, .. })
    ));
    assert!(matches!(
        client.get_album("garbled").await,
        Err(FetcherError::ParseError(_))
    ));
}

#[tokio::test]
async fn test_listing_error_aborts_without_partial_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/mediaItems:search"))
        .and(body_json(json!({"albumId": "a1", "pageSize": 100, "pageToken": "next"})))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/mediaItems:search"))
        .and(body_json(json!({"albumId": "a1", "pageSize": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mediaItems": [{"id": "m1", "filename": "one.jpg", "baseUrl": "https://lh3/one"}],
            "nextPageToken": "next"
        })))
        .mount(&server)
        .await;

    let result = list_media_items(&client_for(&server), "a1").await;
    assert!(matches!(result, Err(FetcherError::ApiError { status: 503, .. })));
}

#[tokio::test]
async fn test_transfer_returns_body_on_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/content/one=d"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xff\xd8\xff\xe0".to_vec()))
        .mount(&server)
        .await;

    let transfer = HttpContentTransfer::with_client(Arc::new(Client::new()));
    let response = transfer
        .fetch(&format!("{}/content/one=d", server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_ref(), b"\xff\xd8\xff\xe0");
}

#[tokio::test]
async fn test_transfer_reports_status_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/content/expired=d"))
        .respond_with(ResponseTemplate::new(403).set_body_string("expired"))
        .mount(&server)
        .await;

    let transfer = HttpContentTransfer::with_client(Arc::new(Client::new()));
    let response = transfer
        .fetch(&format!("{}/content/expired=d", server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_transfer_connection_failure_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let transfer = HttpContentTransfer::with_client(Arc::new(Client::new()));
    let result = transfer
        .fetch(&format!("http://127.0.0.1:{port}/content/x=d"))
        .await;
    assert!(matches!(result, Err(FetcherError::NetworkError(_))));
}
