//! OAuth authentication for the Photos Library API
//!
//! [`Authenticator::authenticate`] resolves a usable token for an account in
//! this order:
//!
//! 1. cached token for the account, if still valid
//! 2. refresh of the cached token with its refresh token
//! 3. full installed-app consent flow over a loopback redirect
//!
//! Whatever was obtained is written back to the per-account cache. The
//! returned [`AccountToken`] implements [`TokenProvider`] and refreshes
//! itself when the access token nears expiry during a long download.

pub mod client_secrets;
pub mod flow;
pub mod token_cache;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::fetcher::photos_http::TokenProvider;
use crate::fetcher::shared_resources::global_http_client;
use crate::fetcher::{FetcherError, FetcherResult};

pub use client_secrets::{ClientSecrets, CREDENTIALS_FILENAME};
pub use token_cache::{token_path_for, StoredToken, TokenResponse};

/// Read-only access to the user's library
pub const SCOPE: &str = "https://www.googleapis.com/auth/photoslibrary.readonly";

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Client secrets file is missing
    #[error("{path} not found. Please download it from Google Cloud Console.")]
    MissingClientSecrets {
        /// Path that was looked up
        path: String,
    },

    /// Client secrets file could not be used
    #[error("invalid client secrets in {path}: {message}")]
    InvalidClientSecrets {
        /// Offending file or field
        path: String,
        /// What was wrong
        message: String,
    },

    /// Token cache could not be read or written
    #[error("token cache error: {0}")]
    TokenCache(String),

    /// Token endpoint rejected the request
    #[error("token endpoint returned {status}: {message}")]
    TokenEndpoint {
        /// HTTP status
        status: u16,
        /// Error and description from the response
        message: String,
    },

    /// The user declined consent
    #[error("authorization was denied: {0}")]
    Denied(String),

    /// Redirect carried a foreign `state`
    #[error("authorization callback state mismatch")]
    StateMismatch,

    /// Redirect could not be understood
    #[error("invalid authorization callback: {0}")]
    InvalidCallback(String),

    /// Network error talking to the token endpoint
    #[error("network error: {0}")]
    NetworkError(String),

    /// No refresh token and no way to run the consent flow
    #[error("access token expired and no refresh token is available")]
    NoRefreshToken,

    /// Shutdown requested while waiting for consent
    #[error("authorization cancelled")]
    Cancelled,
}

impl From<AuthError> for FetcherError {
    fn from(err: AuthError) -> Self {
        FetcherError::Unauthorized(err.to_string())
    }
}

/// Resolves access tokens for accounts
pub struct Authenticator {
    secrets_path: PathBuf,
    token_dir: PathBuf,
    client: Arc<Client>,
}

impl Authenticator {
    /// Authenticator reading client secrets from `secrets_path` and caching
    /// tokens in `token_dir`
    pub fn new(secrets_path: impl Into<PathBuf>, token_dir: impl Into<PathBuf>) -> Self {
        Self {
            secrets_path: secrets_path.into(),
            token_dir: token_dir.into(),
            client: global_http_client(),
        }
    }

    /// Use a specific HTTP client for token endpoint calls
    pub fn with_client(mut self, client: Arc<Client>) -> Self {
        self.client = client;
        self
    }

    /// Cache file used for `email`
    pub fn token_path(&self, email: &str) -> PathBuf {
        token_path_for(&self.token_dir, email)
    }

    /// Obtain a valid token for `email`
    pub async fn authenticate(&self, email: &str) -> Result<AccountToken, AuthError> {
        let cache_path = self.token_path(email);
        let cached = match StoredToken::load(&cache_path) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable token cache");
                None
            }
        };

        if let Some(token) = cached.as_ref().filter(|t| t.is_valid(Utc::now())) {
            info!(email = %email, "Using cached credentials");
            // Secrets are only needed for a later refresh, so their absence
            // is not fatal here.
            let secrets = ClientSecrets::load(&self.secrets_path).ok();
            return Ok(self.account_token(token.clone(), secrets, cache_path));
        }

        let secrets = ClientSecrets::load(&self.secrets_path)?;

        if let Some(refresh_token) = cached.as_ref().and_then(|t| t.refresh_token.clone()) {
            match flow::refresh_access_token(&self.client, &secrets, &refresh_token).await {
                Ok(response) => {
                    let token = StoredToken::from_response(response, Some(refresh_token), Utc::now());
                    save_token(&token, &cache_path);
                    info!(email = %email, "Refreshed credentials");
                    return Ok(self.account_token(token, Some(secrets), cache_path));
                }
                Err(e) => warn!(error = %e, "Token refresh failed, starting a new authorization"),
            }
        }

        let response = flow::run_loopback_flow(&self.client, &secrets).await?;
        let token = StoredToken::from_response(response, None, Utc::now());
        save_token(&token, &cache_path);
        info!(email = %email, "Successfully authenticated");
        Ok(self.account_token(token, Some(secrets), cache_path))
    }

    fn account_token(
        &self,
        token: StoredToken,
        secrets: Option<ClientSecrets>,
        cache_path: PathBuf,
    ) -> AccountToken {
        AccountToken {
            client: self.client.clone(),
            secrets,
            cache_path,
            token: Mutex::new(token),
        }
    }
}

fn save_token(token: &StoredToken, path: &Path) {
    if let Err(e) = token.save(path) {
        warn!(path = %path.display(), error = %e, "Failed to cache credentials");
    }
}

/// An authenticated account's token, refreshed on demand
pub struct AccountToken {
    client: Arc<Client>,
    secrets: Option<ClientSecrets>,
    cache_path: PathBuf,
    token: Mutex<StoredToken>,
}

impl AccountToken {
    /// A valid access token, refreshing and re-caching it when needed
    pub async fn current(&self) -> Result<String, AuthError> {
        let mut token = self.token.lock().await;
        if token.is_valid(Utc::now()) {
            return Ok(token.access_token.clone());
        }

        let (Some(secrets), Some(refresh_token)) = (&self.secrets, token.refresh_token.clone())
        else {
            return Err(AuthError::NoRefreshToken);
        };
        let response = flow::refresh_access_token(&self.client, secrets, &refresh_token).await?;
        *token = StoredToken::from_response(response, Some(refresh_token), Utc::now());
        save_token(&token, &self.cache_path);
        info!("Access token refreshed");
        Ok(token.access_token.clone())
    }

    /// Cache file backing this token
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }
}

#[async_trait]
impl TokenProvider for AccountToken {
    async fn access_token(&self) -> FetcherResult<String> {
        Ok(self.current().await?)
    }
}
