//! CLI error types and conversions

use crate::auth::AuthError;
use crate::downloader::DownloadError;
use crate::fetcher::FetcherError;
use crate::resume::ResumeError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Authentication error
    #[error("authentication failed: {0}")]
    AuthError(#[from] AuthError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Download error
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Resume error
    #[error("resume error: {0}")]
    ResumeError(#[from] ResumeError),

    /// Terminal IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Standard input closed while a prompt was waiting
    #[error("input closed before an answer was given")]
    InputClosed,

    /// The user interrupted the session
    #[error("operation cancelled by user")]
    Cancelled,
}

impl CliError {
    /// Whether the error is a user cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::AuthError(AuthError::Cancelled))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError(err.to_string())
    }
}
