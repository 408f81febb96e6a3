//! Download metrics
//!
//! Emitted through the `metrics` facade. Without an installed recorder every
//! call is a no-op, so the driver records unconditionally.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome label for a single transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 200 OK and the file was written
    Success,
    /// 403/429 response
    RateLimited,
    /// Any other non-success status
    HttpError,
    /// Connection, TLS or body read failure
    TransportError,
    /// The download link could not be resolved
    ResolveError,
    /// 200 OK but the file could not be written
    WriteError,
}

impl AttemptOutcome {
    /// Label value used on the `transfer_attempts_total` counter
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RateLimited => "rate_limited",
            Self::HttpError => "http_error",
            Self::TransportError => "transport_error",
            Self::ResolveError => "resolve_error",
            Self::WriteError => "write_error",
        }
    }
}

/// Register metric descriptions. Safe to call more than once.
pub fn describe_metrics() {
    describe_counter!(
        "media_items_downloaded_total",
        Unit::Count,
        "Media items written to disk and recorded in the ledger"
    );
    describe_counter!(
        "media_items_failed_total",
        Unit::Count,
        "Media items that ended the run in the failed state"
    );
    describe_counter!(
        "media_items_skipped_total",
        Unit::Count,
        "Media items skipped because the ledger already lists them"
    );
    describe_counter!(
        "transfer_attempts_total",
        Unit::Count,
        "Transfer attempts by outcome"
    );
    describe_counter!(
        "ledger_write_failures_total",
        Unit::Count,
        "Ledger rewrites that could not be persisted"
    );
    describe_histogram!(
        "transfer_duration_seconds",
        Unit::Seconds,
        "Duration of a single transfer attempt"
    );
}

/// Times one transfer attempt and records its outcome
pub struct TransferMetrics {
    album_id: String,
    start_time: Instant,
}

impl TransferMetrics {
    /// Start timing an attempt
    pub fn start(album_id: &str) -> Self {
        Self {
            album_id: album_id.to_string(),
            start_time: Instant::now(),
        }
    }

    /// Record the attempt outcome and its duration
    pub fn finish(self, outcome: AttemptOutcome) -> Duration {
        let duration = self.start_time.elapsed();
        counter!("transfer_attempts_total", "outcome" => outcome.as_label()).increment(1);
        histogram!("transfer_duration_seconds").record(duration.as_secs_f64());
        debug!(
            album_id = %self.album_id,
            outcome = outcome.as_label(),
            duration_ms = duration.as_millis() as u64,
            "Transfer attempt recorded"
        );
        duration
    }
}

/// Count a downloaded item
pub fn record_downloaded() {
    counter!("media_items_downloaded_total").increment(1);
}

/// Count a failed item
pub fn record_failed() {
    counter!("media_items_failed_total").increment(1);
}

/// Count a skipped item
pub fn record_skipped() {
    counter!("media_items_skipped_total").increment(1);
}

/// Count a ledger write that did not persist
pub fn record_ledger_write_failure() {
    counter!("ledger_write_failures_total").increment(1);
}
