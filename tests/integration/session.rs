//! Integration tests for the interactive session against fake services

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use photos_album_downloader::cli::{Prompter, Session, SessionConfig};
use photos_album_downloader::downloader::DriverConfig;
use photos_album_downloader::resume::ProgressLedger;
use photos_album_downloader::shutdown::ShutdownCoordinator;
use tempfile::TempDir;

use crate::support::{album, photo, FakeApi, FakeTransfer};

fn config(dir: &TempDir) -> SessionConfig {
    SessionConfig {
        credentials: dir.path().join("credentials.json"),
        token_dir: dir.path().to_path_buf(),
        ledger: dir.path().join("downloaded_files.json"),
        email: Some("me@example.com".to_string()),
        driver: DriverConfig::default()
            .with_batch_size(2)
            .with_retry_delay(Duration::ZERO)
            .with_chunk_pause(Duration::ZERO),
        show_progress: false,
    }
}

#[tokio::test]
async fn test_select_album_and_download() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("photos");
    let api = FakeApi {
        albums: vec![album("a1", "Holidays"), album("a2", "Birthday")],
        media_pages: vec![
            vec![photo("m1", "cake.jpg"), photo("m2", "candles.jpg")],
            vec![photo("m3", "party.jpg")],
        ],
        ..FakeApi::default()
    };
    let api = Arc::new(api);
    let transfer = Arc::new(FakeTransfer::new());

    let input = format!("5\n2\n{}\n", out_dir.display());
    let mut output = Vec::new();
    let report = {
        let prompter = Prompter::new(Cursor::new(input), &mut output);
        let mut session = Session::new(config(&dir), prompter, ShutdownCoordinator::shared());
        session
            .download(api.clone(), transfer.clone())
            .await
            .unwrap()
            .unwrap()
    };

    assert_eq!(report.album_id, "a2");
    assert_eq!(report.total_items, 3);
    assert_eq!(report.downloaded, 3);
    assert_eq!(report.chunks, 2);
    assert!(out_dir.join("party.jpg").is_file());

    let ledger = ProgressLedger::read_strict(dir.path().join("downloaded_files.json")).unwrap();
    assert_eq!(ledger.len("a2"), 3);

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("1. Holidays (ID: a1)"));
    assert!(text.contains("Please enter a number between 1 and 2"));
    assert!(text.contains("Total media items found: 3"));
    assert!(text.contains("Total files downloaded: 3 of 3"));
}

#[tokio::test]
async fn test_no_albums_prints_hints() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    let transfer = Arc::new(FakeTransfer::new());

    let mut output = Vec::new();
    let report = {
        let prompter = Prompter::new(Cursor::new(""), &mut output);
        let mut session = Session::new(config(&dir), prompter, ShutdownCoordinator::shared());
        session.download(api, transfer).await.unwrap()
    };

    assert!(report.is_none());
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("No albums found in your Google Photos account."));
    assert!(text.contains("2. The app doesn't have proper permissions"));
}

#[tokio::test]
async fn test_banner_shows_batch_size() {
    let dir = TempDir::new().unwrap();
    let mut output = Vec::new();
    {
        let prompter = Prompter::new(Cursor::new(""), &mut output);
        let mut session = Session::new(config(&dir), prompter, ShutdownCoordinator::shared());
        session.banner().unwrap();
    }
    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("Google Photos Album Downloader (with batch processing)"));
    assert!(text.contains("Batch size: 2 photos"));
}
