//! Integration tests for token refresh and code exchange against a mock
//! token endpoint

use chrono::{Duration, Utc};
use photos_album_downloader::auth::flow::{exchange_code, refresh_access_token};
use photos_album_downloader::auth::{AuthError, Authenticator, ClientSecrets, StoredToken};
use photos_album_downloader::fetcher::photos_http::TokenProvider;
use reqwest::Client;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn secrets_json(server: &MockServer) -> String {
    json!({
        "installed": {
            "client_id": "cid.apps.googleusercontent.com",
            "client_secret": "secret",
            "auth_uri": format!("{}/auth", server.uri()),
            "token_uri": format!("{}/token", server.uri()),
            "redirect_uris": ["http://localhost"]
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_refresh_posts_form_and_keeps_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Fstored"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.fresh",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/photoslibrary.readonly",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let credentials = dir.path().join("credentials.json");
    std::fs::write(&credentials, secrets_json(&server)).unwrap();

    let auth = Authenticator::new(&credentials, dir.path());
    let cache_path = auth.token_path("me@example.com");
    StoredToken {
        access_token: "ya29.stale".to_string(),
        refresh_token: Some("1//stored".to_string()),
        expires_at: Some(Utc::now() - Duration::minutes(5)),
        scope: None,
    }
    .save(&cache_path)
    .unwrap();

    let token = auth.authenticate("me@example.com").await.unwrap();
    assert_eq!(token.access_token().await.unwrap(), "ya29.fresh");

    let cached = StoredToken::load(&cache_path).unwrap().unwrap();
    assert_eq!(cached.access_token, "ya29.fresh");
    assert_eq!(cached.refresh_token.as_deref(), Some("1//stored"));
    assert!(cached.is_valid(Utc::now()));
}

#[tokio::test]
async fn test_exchange_code_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("client_id=cid.apps.googleusercontent.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.new",
            "expires_in": 3599,
            "refresh_token": "1//new-refresh"
        })))
        .mount(&server)
        .await;

    let secrets = ClientSecrets::parse(&secrets_json(&server)).unwrap();
    let response = exchange_code(&Client::new(), &secrets, "the-code", "http://127.0.0.1:9/")
        .await
        .unwrap();
    assert_eq!(response.access_token, "ya29.new");
    assert_eq!(response.refresh_token.as_deref(), Some("1//new-refresh"));
}

#[tokio::test]
async fn test_token_endpoint_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let secrets = ClientSecrets::parse(&secrets_json(&server)).unwrap();
    let err = refresh_access_token(&Client::new(), &secrets, "revoked")
        .await
        .unwrap_err();
    match err {
        AuthError::TokenEndpoint { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "invalid_grant: Token has been expired or revoked.");
        }
        other => panic!("expected TokenEndpoint, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_credentials_file_is_setup_error() {
    let dir = TempDir::new().unwrap();
    let auth = Authenticator::new(dir.path().join("credentials.json"), dir.path());

    let err = auth.authenticate("new@example.com").await.err().unwrap();
    assert!(matches!(err, AuthError::MissingClientSecrets { .. }));
    assert!(err.to_string().contains("Google Cloud Console"));
}
