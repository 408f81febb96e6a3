//! OAuth client secrets (`credentials.json`)

use serde::Deserialize;
use std::path::Path;

use super::AuthError;

/// Default client secrets filename, looked up in the working directory
pub const CREDENTIALS_FILENAME: &str = "credentials.json";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client registration as downloaded from Google Cloud Console
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// Consent page endpoint
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token exchange endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Read client secrets from `path`, accepting either an `installed` or a
    /// `web` client section
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        if !path.exists() {
            return Err(AuthError::MissingClientSecrets {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| AuthError::InvalidClientSecrets {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|message| AuthError::InvalidClientSecrets {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse the JSON content of a client secrets file
    pub fn parse(content: &str) -> Result<Self, String> {
        let file: SecretsFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let secrets = file
            .installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" client section".to_string())?;
        if secrets.client_id.trim().is_empty() {
            return Err("client_id is empty".to_string());
        }
        Ok(secrets)
    }
}
