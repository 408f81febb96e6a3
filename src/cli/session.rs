//! Interactive download session
//!
//! Authenticates, lets the user pick an album, lists its media items and
//! hands them to the [`DownloadDriver`].

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{Cli, CliError, Prompter};
use crate::auth::Authenticator;
use crate::downloader::{DownloadDriver, DownloadReport, DriverConfig};
use crate::fetcher::pagination::{list_albums, list_media_items_with_progress};
use crate::fetcher::photos_http::{HttpContentTransfer, PhotosHttpClient};
use crate::fetcher::{ContentTransfer, PhotosApi};
use crate::resume::ProgressLedger;
use crate::shutdown::SharedShutdown;

/// Lines printed when albums cannot be listed
pub const NO_ALBUMS_HINTS: &[&str] = &[
    "No albums found in your Google Photos account.",
    "This could be because:",
    "1. You don't have any albums",
    "2. The app doesn't have proper permissions",
    "3. There was an error accessing your albums",
];

/// Lines printed after a fatal error
pub const TROUBLESHOOTING_HINTS: &[&str] = &[
    "Please ensure you have:",
    "1. Downloaded the correct credentials.json from Google Cloud Console",
    "2. Enabled the Google Photos Library API in your project",
    "3. Created OAuth 2.0 credentials with the correct scopes",
    "",
    "For detailed error information, check the log output above.",
];

/// Everything a session needs besides the terminal and the API
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Client secrets file
    pub credentials: PathBuf,
    /// Token cache directory
    pub token_dir: PathBuf,
    /// Ledger file
    pub ledger: PathBuf,
    /// Preset account email
    pub email: Option<String>,
    /// Driver tunables
    pub driver: DriverConfig,
    /// Draw spinners while listing
    pub show_progress: bool,
}

impl SessionConfig {
    /// Session configuration from parsed flags
    pub fn from_cli(cli: &Cli, show_progress: bool) -> Self {
        Self {
            credentials: cli.credentials.clone(),
            token_dir: cli.token_dir.clone(),
            ledger: cli.ledger.clone(),
            email: cli.email.clone(),
            driver: cli.driver_config(show_progress),
            show_progress,
        }
    }
}

/// One interactive run
pub struct Session<R, W> {
    config: SessionConfig,
    prompter: Prompter<R, W>,
    shutdown: SharedShutdown,
}

impl<R: BufRead, W: Write> Session<R, W> {
    /// Create a session
    pub fn new(config: SessionConfig, prompter: Prompter<R, W>, shutdown: SharedShutdown) -> Self {
        Self {
            config,
            prompter,
            shutdown,
        }
    }

    fn check_cancelled(&self) -> Result<(), CliError> {
        if self.shutdown.is_shutdown_requested() {
            return Err(CliError::Cancelled);
        }
        Ok(())
    }

    /// Print the banner
    pub fn banner(&mut self) -> Result<(), CliError> {
        self.prompter
            .say("Google Photos Album Downloader (with batch processing)")?;
        self.prompter
            .say("--------------------------------------------------")?;
        let batch_size = self.config.driver.batch_size;
        self.prompter.say(format!("Batch size: {batch_size} photos"))?;
        self.prompter.say("")
    }

    /// Full session: banner, authentication, album selection and download.
    ///
    /// Returns `None` when the account has no albums to offer.
    pub async fn run(&mut self) -> Result<Option<DownloadReport>, CliError> {
        self.banner()?;

        let email = match self.config.email.clone() {
            Some(email) => email,
            None => self.prompter.email()?,
        };
        self.check_cancelled()?;

        let authenticator = Authenticator::new(&self.config.credentials, &self.config.token_dir);
        let token = authenticator.authenticate(&email).await?;
        info!(email = %email, "Successfully authenticated for user");

        let api: Arc<dyn PhotosApi> = Arc::new(PhotosHttpClient::new(Arc::new(token)));
        let transfer: Arc<dyn ContentTransfer> = Arc::new(HttpContentTransfer::new());
        self.download(api, transfer).await
    }

    /// Album selection and download against an already authenticated API
    pub async fn download(
        &mut self,
        api: Arc<dyn PhotosApi>,
        transfer: Arc<dyn ContentTransfer>,
    ) -> Result<Option<DownloadReport>, CliError> {
        self.prompter.say("\nFetching albums...")?;
        let albums = list_albums(api.as_ref()).await?;
        if albums.is_empty() {
            for line in NO_ALBUMS_HINTS {
                self.prompter.say(line)?;
            }
            return Ok(None);
        }

        let index = self.prompter.select_album(&albums)?;
        self.check_cancelled()?;
        let selected = &albums[index];
        let output_dir = self.prompter.output_dir()?;
        self.check_cancelled()?;

        let mut ledger = ProgressLedger::load(&self.config.ledger);
        info!(
            previously_downloaded = ledger.len(&selected.id),
            "Found previously downloaded files"
        );

        let title = match api.get_album(&selected.id).await {
            Ok(album) if !album.title.is_empty() => album.title,
            Ok(_) => "Unnamed Album".to_string(),
            Err(e) => {
                warn!(album_id = %selected.id, error = %e, "Could not fetch album details");
                selected.title.clone()
            }
        };
        info!(album_id = %selected.id, title = %title, "Processing album");

        self.prompter.say("Fetching media items list...")?;
        let spinner = self.listing_spinner();
        let items = list_media_items_with_progress(api.as_ref(), &selected.id, |count| {
            spinner.set_message(format!("Found {count} items..."));
        })
        .await;
        spinner.finish_and_clear();
        let items = items?;
        self.prompter
            .say(format!("Total media items found: {}", items.len()))?;

        let driver = DownloadDriver::new(api, transfer, self.config.driver.clone())
            .with_shutdown(self.shutdown.clone());
        let report = driver
            .run(&mut ledger, &selected.id, &items, &output_dir)
            .await?;

        self.summary(&report)?;
        Ok(Some(report))
    }

    fn listing_spinner(&self) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    /// Print the end-of-run summary
    pub fn summary(&mut self, report: &DownloadReport) -> Result<(), CliError> {
        if report.interrupted {
            self.prompter
                .say("\nDownload interrupted. Progress has been saved; run again to resume.")?;
        } else {
            self.prompter.say("\nDownload complete!")?;
        }
        self.prompter.say(format!(
            "Total files downloaded: {} of {}",
            report.total_downloaded, report.total_items
        ))?;
        if report.failed > 0 {
            self.prompter
                .say(format!("{} files failed and will be retried on the next run:", report.failed))?;
            for failure in &report.failures {
                self.prompter
                    .say(format!("  {}: {}", failure.filename, failure.reason))?;
            }
        }
        Ok(())
    }
}
