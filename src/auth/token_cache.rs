//! Per-account OAuth token cache

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::AuthError;

/// Tokens this close to expiry are treated as expired
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Cache file for `email` inside `token_dir`.
///
/// `@` becomes `_at_` so each account keeps its own file; an empty email
/// maps to `token.json`.
pub fn token_path_for(token_dir: &Path, email: &str) -> PathBuf {
    let email = email.trim();
    if email.is_empty() {
        return token_dir.join("token.json");
    }
    let safe: String = email
        .replace('@', "_at_")
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    token_dir.join(format!("token_{safe}.json"))
}

/// Response body of the OAuth token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Present on code exchange, usually absent on refresh
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes, space separated
    #[serde(default)]
    pub scope: Option<String>,
    /// Usually `Bearer`
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Token material persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Bearer token
    pub access_token: String,
    /// Long-lived refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry of `access_token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl StoredToken {
    /// Build from a token endpoint response received at `now`.
    ///
    /// A refresh response without a refresh token keeps `previous_refresh`.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
            scope: response.scope,
        }
    }

    /// Whether the access token is expired, or will be within
    /// [`EXPIRY_MARGIN_SECS`], at `now`. Tokens without a known expiry are
    /// considered valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_MARGIN_SECS) >= expires_at,
            None => false,
        }
    }

    /// Whether the token can be used at `now` without refreshing
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && !self.is_expired(now)
    }

    /// Load a cached token. Returns `Ok(None)` when no cache file exists.
    pub fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        if !path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| AuthError::TokenCache(e.to_string()))?;
        let token = serde_json::from_str(&content).map_err(|e| {
            AuthError::TokenCache(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(Some(token))
    }

    /// Write the token atomically, readable only by the owner on Unix
    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| AuthError::TokenCache(e.to_string()))?;

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AuthError::TokenCache(e.to_string()))?;
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| AuthError::TokenCache(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| AuthError::TokenCache(format!("Failed to write token: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = temp_file
                .as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600));
        }

        temp_file
            .persist(path)
            .map_err(|e| AuthError::TokenCache(format!("Failed to persist token: {e}")))?;
        debug!(path = %path.display(), "Token cache saved");
        Ok(())
    }
}
