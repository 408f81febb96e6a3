//! Progress reporting for chunked album downloads.
//!
//! The driver reports through [`ChunkProgress`]: structured `tracing` events
//! always, plus an `indicatif` bar when enabled. Message formatting lives in
//! free functions so it can be tested without a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::info;

use super::item::ItemState;

/// Header line for a chunk, with 1-based, inclusive item positions
pub fn format_chunk_header(chunk_index: usize, start: usize, end: usize, total: usize) -> String {
    format!(
        "Processing batch {} (items {} to {} of {})",
        chunk_index + 1,
        start + 1,
        end,
        total
    )
}

/// Summary line after a chunk
pub fn format_chunk_summary(chunk_index: usize, downloaded_so_far: usize) -> String {
    format!(
        "Completed batch {}: {} files downloaded so far",
        chunk_index + 1,
        downloaded_so_far
    )
}

/// Items per second since `start`, 0 when no time has passed
pub fn items_per_second(items: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        0.0
    } else {
        items as f64 / secs
    }
}

/// Progress sink for one album download
pub struct ChunkProgress {
    bar: ProgressBar,
    started: Instant,
    total: usize,
}

impl ChunkProgress {
    /// Create a reporter for `total` items; `visible` draws a progress bar
    pub fn new(total: usize, visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            started: Instant::now(),
            total,
        }
    }

    /// A chunk of items `[start, end)` is about to be processed
    pub fn start_chunk(&self, chunk_index: usize, start: usize, end: usize) {
        let header = format_chunk_header(chunk_index, start, end, self.total);
        info!(chunk = chunk_index + 1, start = start + 1, end, total = self.total, "{header}");
        self.bar.set_message(header);
    }

    /// An item reached a terminal state
    pub fn item_finished(&self, filename: &str, state: &ItemState) {
        match state {
            ItemState::Done { .. } => self.bar.set_message(format!("Downloaded {filename}")),
            ItemState::Skipped => self.bar.set_message(format!("Skipping {filename} (already downloaded)")),
            _ => {}
        }
        self.bar.inc(1);
    }

    /// A chunk finished; `downloaded_so_far` counts every file known downloaded
    pub fn finish_chunk(&self, chunk_index: usize, downloaded_so_far: usize, processed: usize) {
        let rate = items_per_second(processed, self.started.elapsed());
        info!(
            chunk = chunk_index + 1,
            downloaded_so_far,
            items_per_sec = rate,
            "{}",
            format_chunk_summary(chunk_index, downloaded_so_far)
        );
    }

    /// Taking the courtesy pause before the next chunk
    pub fn pausing(&self, pause: Duration) {
        if !pause.is_zero() {
            self.bar
                .set_message(format!("Taking a short break ({}s) before next batch...", pause.as_secs()));
        }
    }

    /// Tear down the bar
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
