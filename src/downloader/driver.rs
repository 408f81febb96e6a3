//! Resumable download driver
//!
//! Walks an album's item list chunk by chunk. Items already in the ledger are
//! skipped without any network call; every other item gets up to
//! `retry_count` transfer attempts, each with a freshly resolved download
//! link. Successful items are written to disk and recorded in the ledger
//! before the next item starts.

use crate::downloader::config::DriverConfig;
use crate::downloader::item::{DownloadReport, FailureReason, ItemState};
use crate::downloader::progress::ChunkProgress;
use crate::downloader::DownloadError;
use crate::fetcher::{ContentTransfer, PhotosApi};
use crate::metrics::{self, AttemptOutcome, TransferMetrics};
use crate::resume::ProgressLedger;
use crate::shutdown::{self, SharedShutdown};
use crate::MediaItem;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};

/// Whether a transfer status means "slow down and try again"
pub fn is_rate_limited(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
}

/// Output path for `filename`, or `None` when the name is empty or would
/// escape `output_dir`
pub fn target_path(output_dir: &Path, filename: &str) -> Option<PathBuf> {
    if filename.is_empty() || filename.contains(['/', '\\']) {
        return None;
    }
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(output_dir.join(filename)),
        _ => None,
    }
}

/// Write `body` to `target` through a temp file in the same directory so the
/// target is either complete or absent
fn write_output(target: &Path, body: &[u8]) -> std::io::Result<()> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    temp_file.write_all(body)?;
    temp_file.flush()?;
    temp_file.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Drives the download of one album at a time
pub struct DownloadDriver {
    api: Arc<dyn PhotosApi>,
    transfer: Arc<dyn ContentTransfer>,
    config: DriverConfig,
    shutdown: Option<SharedShutdown>,
}

impl DownloadDriver {
    /// Create a driver. Picks up the global shutdown handle if one is registered.
    pub fn new(
        api: Arc<dyn PhotosApi>,
        transfer: Arc<dyn ContentTransfer>,
        config: DriverConfig,
    ) -> Self {
        Self {
            api,
            transfer,
            config,
            shutdown: shutdown::get_global_shutdown(),
        }
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Driver configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
    }

    /// Sleep unless shut down first. Returns `false` when interrupted.
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.shutdown_requested();
        }
        match &self.shutdown {
            Some(shutdown) => shutdown.sleep_or_shutdown(duration).await,
            None => {
                tokio::time::sleep(duration).await;
                true
            }
        }
    }

    /// Download every item of `album_id` not yet in the ledger into `output_dir`.
    ///
    /// Per-item failures are logged and reported, never returned as errors;
    /// the only error is an unusable output directory.
    pub async fn run(
        &self,
        ledger: &mut ProgressLedger,
        album_id: &str,
        items: &[MediaItem],
        output_dir: &Path,
    ) -> Result<DownloadReport, DownloadError> {
        let span = tracing::info_span!("download_album", album_id = %album_id, items = items.len());
        self.run_album(ledger, album_id, items, output_dir)
            .instrument(span)
            .await
    }

    async fn run_album(
        &self,
        ledger: &mut ProgressLedger,
        album_id: &str,
        items: &[MediaItem],
        output_dir: &Path,
    ) -> Result<DownloadReport, DownloadError> {
        if album_id.is_empty() {
            return Err(DownloadError::ValidationError("album id is empty".to_string()));
        }
        std::fs::create_dir_all(output_dir).map_err(|e| {
            DownloadError::IoError(format!(
                "Failed to create output directory {}: {e}",
                output_dir.display()
            ))
        })?;

        let mut downloaded = ledger.loaded_set(album_id);
        info!(
            previously_downloaded = downloaded.len(),
            output_dir = %output_dir.display(),
            "Starting album download"
        );

        let mut report = DownloadReport::new(album_id, items.len());
        let progress = ChunkProgress::new(items.len(), self.config.show_progress);
        let batch_size = self.config.batch_size.max(1);
        let chunk_count = self.config.chunk_count(items.len());

        'chunks: for (chunk_index, chunk) in items.chunks(batch_size).enumerate() {
            let start = chunk_index * batch_size;
            report.chunks += 1;
            progress.start_chunk(chunk_index, start, start + chunk.len());

            for item in chunk {
                if self.shutdown_requested() {
                    info!("Shutdown requested - stopping before next item");
                    report.interrupted = true;
                    break 'chunks;
                }

                let state = self
                    .process_item(ledger, album_id, item, output_dir, &mut downloaded, &mut report)
                    .await;
                progress.item_finished(&item.filename, &state);
                report.record(&item.id, &item.filename, &state);
            }

            progress.finish_chunk(chunk_index, downloaded.len(), report.processed());

            if chunk_index + 1 < chunk_count {
                progress.pausing(self.config.chunk_pause);
                if !self.pause(self.config.chunk_pause).await {
                    info!("Shutdown requested during pause between batches");
                    report.interrupted = true;
                    break;
                }
            }
        }

        progress.finish();
        report.total_downloaded = downloaded.len();
        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            total_downloaded = report.total_downloaded,
            total_items = report.total_items,
            interrupted = report.interrupted,
            "Album download finished"
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        ledger: &mut ProgressLedger,
        album_id: &str,
        item: &MediaItem,
        output_dir: &Path,
        downloaded: &mut HashSet<String>,
        report: &mut DownloadReport,
    ) -> ItemState {
        if downloaded.contains(&item.filename) {
            debug!(filename = %item.filename, "Skipping (already downloaded)");
            metrics::record_skipped();
            return ItemState::Skipped;
        }

        let Some(target) = target_path(output_dir, &item.filename) else {
            warn!(
                media_item_id = %item.id,
                filename = %item.filename,
                "Refusing to write media item with an invalid filename"
            );
            metrics::record_failed();
            return ItemState::Failed(FailureReason::InvalidFilename);
        };

        let state = self.download_with_retry(album_id, item, &target, report).await;
        match &state {
            ItemState::Done { .. } => {
                downloaded.insert(item.filename.clone());
                if let Err(e) = ledger.record(album_id, &item.filename) {
                    warn!(
                        filename = %item.filename,
                        error = %e,
                        "Downloaded file could not be recorded in the ledger"
                    );
                    metrics::record_ledger_write_failure();
                }
                metrics::record_downloaded();
            }
            ItemState::Failed(_) => metrics::record_failed(),
            _ => {}
        }
        state
    }

    async fn download_with_retry(
        &self,
        album_id: &str,
        item: &MediaItem,
        target: &Path,
        report: &mut DownloadReport,
    ) -> ItemState {
        let max_attempts = self.config.retry_count.max(1);
        let mut last_transport_error = String::new();
        let mut attempts_made = 0;

        for attempt in 1..=max_attempts {
            attempts_made = attempt;
            let attempts_remain = attempt < max_attempts;
            let state = ItemState::Downloading { attempt };
            debug!(
                filename = %item.filename,
                state = ?state,
                max_attempts,
                "Starting transfer attempt"
            );

            // Links expire, so every attempt starts from a fresh one.
            let url = match self.api.resolve_download_url(&item.id).await {
                Ok(url) => url,
                Err(e) => {
                    TransferMetrics::start(album_id).finish(AttemptOutcome::ResolveError);
                    error!(
                        filename = %item.filename,
                        attempt,
                        error = %e,
                        "Error getting fresh download link"
                    );
                    return ItemState::Failed(FailureReason::LinkResolution(e.to_string()));
                }
            };

            let timer = TransferMetrics::start(album_id);
            report.transfer_attempts += 1;
            match self.transfer.fetch(&url).await {
                Ok(response) if response.status == StatusCode::OK => {
                    if let Err(e) = write_output(target, &response.body) {
                        timer.finish(AttemptOutcome::WriteError);
                        error!(
                            filename = %item.filename,
                            path = %target.display(),
                            error = %e,
                            "Failed to write downloaded file"
                        );
                        return ItemState::Failed(FailureReason::Write(e.to_string()));
                    }
                    timer.finish(AttemptOutcome::Success);
                    info!(
                        filename = %item.filename,
                        bytes = response.body.len(),
                        attempt,
                        "Downloaded"
                    );
                    return ItemState::Done { attempts: attempt };
                }
                Ok(response) if is_rate_limited(response.status) => {
                    timer.finish(AttemptOutcome::RateLimited);
                    if !attempts_remain {
                        error!(
                            filename = %item.filename,
                            attempts = attempt,
                            "Failed to download after {max_attempts} attempts"
                        );
                        return ItemState::Failed(FailureReason::RateLimited { attempts: attempt });
                    }
                    warn!(
                        filename = %item.filename,
                        status = response.status.as_u16(),
                        attempt,
                        "Retrying after rate-limited response"
                    );
                    if !self.pause(self.config.retry_delay).await {
                        return ItemState::Failed(FailureReason::RateLimited { attempts: attempt });
                    }
                }
                Ok(response) => {
                    timer.finish(AttemptOutcome::HttpError);
                    error!(
                        filename = %item.filename,
                        status = response.status.as_u16(),
                        "Failed to download"
                    );
                    return ItemState::Failed(FailureReason::HttpStatus(response.status.as_u16()));
                }
                Err(e) => {
                    timer.finish(AttemptOutcome::TransportError);
                    warn!(
                        filename = %item.filename,
                        attempt,
                        error = %e,
                        "Error downloading"
                    );
                    last_transport_error = e.to_string();
                    if !attempts_remain || self.shutdown_requested() {
                        break;
                    }
                }
            }
        }

        ItemState::Failed(FailureReason::Transport {
            attempts: attempts_made,
            message: last_transport_error,
        })
    }
}
