//! Shared HTTP client for metadata and content requests
//!
//! One `reqwest::Client` is reused by the metadata client, the content
//! transfer and the OAuth token exchange so connections are pooled.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Global HTTP client.
///
/// Only the connect phase is bounded: original-quality videos can take
/// minutes to transfer.
pub static GLOBAL_HTTP_CLIENT: Lazy<Arc<Client>> = Lazy::new(|| {
    let client = Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build configured HTTP client, using defaults");
            Client::new()
        });
    Arc::new(client)
});

/// Get the global HTTP client
pub fn global_http_client() -> Arc<Client> {
    GLOBAL_HTTP_CLIENT.clone()
}
