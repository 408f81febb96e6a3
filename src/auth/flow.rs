//! OAuth installed-app flow over a loopback redirect
//!
//! The consent URL is printed for the user; the browser redirects back to a
//! one-shot listener on `127.0.0.1` carrying `code` and `state`, and the code
//! is exchanged at the token endpoint.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};

use super::client_secrets::ClientSecrets;
use super::token_cache::TokenResponse;
use super::{AuthError, SCOPE};

/// How long the loopback server may keep finishing responses after the code arrived
const SERVER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

const SUCCESS_PAGE: &str = "<html><body>The authentication flow has completed. \
You may close this window.</body></html>";

/// Query parameters delivered to the loopback redirect
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// Echoed anti-forgery state
    pub state: Option<String>,
    /// Error reported by the consent page, e.g. `access_denied`
    pub error: Option<String>,
}

impl CallbackParams {
    fn is_oauth_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

/// Random anti-forgery token for the `state` parameter
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Consent page URL requesting offline, read-only access
pub fn authorization_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    state: &str,
) -> Result<Url, AuthError> {
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", SCOPE),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| AuthError::InvalidClientSecrets {
        path: "auth_uri".to_string(),
        message: e.to_string(),
    })
}

/// Validate a callback against the expected state and extract the code
pub fn authorization_code(params: CallbackParams, expected_state: &str) -> Result<String, AuthError> {
    if let Some(error) = params.error {
        return Err(AuthError::Denied(error));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::InvalidCallback("missing authorization code".to_string()))
}

struct CallbackState {
    expected_state: String,
    code_tx: Mutex<Option<oneshot::Sender<Result<String, AuthError>>>>,
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    // Browsers also probe the redirect host without OAuth parameters.
    if !params.is_oauth_callback() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let result = authorization_code(params, &state.expected_state);
    let response = match &result {
        Ok(_) => Html(SUCCESS_PAGE).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Html(format!("<html><body>Authorization failed: {e}</body></html>")),
        )
            .into_response(),
    };

    match state.code_tx.lock().await.take() {
        Some(code_tx) => {
            let _ = code_tx.send(result);
        }
        None => debug!("Ignoring repeated OAuth redirect"),
    }
    response
}

/// Serve the OAuth redirect on `listener` and return the authorization code.
///
/// Connections are served concurrently, so an idle connection a browser opens
/// ahead of time never blocks the real redirect.
pub async fn receive_code(listener: TcpListener, expected_state: &str) -> Result<String, AuthError> {
    let (code_tx, code_rx) = oneshot::channel();
    let state = Arc::new(CallbackState {
        expected_state: expected_state.to_string(),
        code_tx: Mutex::new(Some(code_tx)),
    });
    let app = Router::new()
        .route("/", get(handle_callback))
        .with_state(state);

    // Dropping `stop_tx` (including on cancellation) also stops the server.
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    let result = code_rx.await.map_err(|_| {
        AuthError::InvalidCallback("loopback server stopped before the redirect arrived".to_string())
    });

    let _ = stop_tx.send(());
    match tokio::time::timeout(SERVER_DRAIN_TIMEOUT, server).await {
        Ok(Ok(Err(e))) => debug!(error = %e, "Loopback server failed"),
        Ok(Err(e)) => debug!(error = %e, "Loopback server task failed"),
        Err(_) => debug!("Loopback server still draining connections"),
        Ok(Ok(Ok(()))) => {}
    }

    result?
}

/// Run the full browser consent flow and return the token endpoint response
pub async fn run_loopback_flow(
    client: &Client,
    secrets: &ClientSecrets,
) -> Result<TokenResponse, AuthError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| AuthError::InvalidCallback(format!("Failed to bind loopback listener: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| AuthError::InvalidCallback(e.to_string()))?
        .port();
    let redirect_uri = format!("http://127.0.0.1:{port}/");
    let state = generate_state();
    let url = authorization_url(secrets, &redirect_uri, &state)?;

    println!("Please visit this URL to authorize this application: {url}");
    info!(port, "Waiting for OAuth redirect");

    let code = match crate::shutdown::get_global_shutdown() {
        Some(shutdown) => tokio::select! {
            code = receive_code(listener, &state) => code?,
            _ = shutdown.wait_for_shutdown() => return Err(AuthError::Cancelled),
        },
        None => receive_code(listener, &state).await?,
    };

    exchange_code(client, secrets, &code, &redirect_uri).await
}

/// Exchange an authorization code for tokens
pub async fn exchange_code(
    client: &Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse, AuthError> {
    let form = [
        ("code", code),
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("redirect_uri", redirect_uri),
        ("grant_type", "authorization_code"),
    ];
    post_token_request(client, &secrets.token_uri, &form).await
}

/// Obtain a new access token from a refresh token
pub async fn refresh_access_token(
    client: &Client,
    secrets: &ClientSecrets,
    refresh_token: &str,
) -> Result<TokenResponse, AuthError> {
    let form = [
        ("refresh_token", refresh_token),
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("grant_type", "refresh_token"),
    ];
    post_token_request(client, &secrets.token_uri, &form).await
}

async fn post_token_request(
    client: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let response = client
        .post(token_uri)
        .form(form)
        .send()
        .await
        .map_err(|e| AuthError::NetworkError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                let error = v.get("error")?.as_str()?.to_string();
                Some(match v.get("error_description").and_then(|d| d.as_str()) {
                    Some(description) => format!("{error}: {description}"),
                    None => error,
                })
            })
            .unwrap_or_else(|| body.trim().to_string());
        return Err(AuthError::TokenEndpoint {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| AuthError::TokenEndpoint {
            status: status.as_u16(),
            message: format!("Failed to parse token response: {e}"),
        })
}
