//! Google OAuth for the Drive client
//!
//! Follows the installed-application flow:
//! 1. Reuse the cached token file when its access token is still valid.
//! 2. Otherwise refresh it with the stored refresh token.
//! 3. Otherwise read the client-secret file, open a loopback listener,
//!    log the consent URL and wait for Google to redirect back with a code.
//!
//! Whatever token results is written back to the token file.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use crate::config::DriveConfig;
use crate::types::{AppError, AppResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
// Treat tokens this close to expiry as already expired
const EXPIRY_SKEW_SECS: i64 = 60;

const CALLBACK_PAGE: &str = "<html><body><h3>Authorization complete.</h3>\
<p>You may close this window and return to the photo booth.</p></body></html>";
const FAILED_PAGE: &str = "<html><body><h3>Authorization failed.</h3>\
<p>Check the server log and try again.</p></body></html>";

/// Client secret as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub async fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> AppResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(content)
            .map_err(|e| AppError::Auth(format!("Invalid client secret file: {}", e)))?;
        file.installed
            .or(file.web)
            .ok_or_else(|| {
                AppError::Auth("Client secret file has no 'installed' or 'web' section".to_string())
            })
    }
}

/// Cached credentials, stored in the same shape Google's client libraries use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.token.is_none() {
            return false;
        }
        match self.expiry {
            Some(expiry) => now < expiry - ChronoDuration::seconds(EXPIRY_SKEW_SECS),
            None => true,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Load the token file. A missing or unreadable file means "no token".
    pub async fn load(path: &Path) -> AppResult<Option<Self>> {
        if !fs::try_exists(path).await? {
            return Ok(None);
        }
        let content = fs::read_to_string(path).await?;
        match serde_json::from_str(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(path = %path.display(), "Ignoring unreadable token file: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Internal(format!("Failed to serialize token: {}", e)))?;
        fs::write(path, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        debug!(path = %path.display(), "Saved OAuth token");
        Ok(())
    }

    fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.token = Some(response.access_token);
        self.expiry = response
            .expires_in
            .map(|secs| now + ChronoDuration::seconds(secs));
        // Google omits the refresh token on refresh; keep the one we have
        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Debug)]
pub enum AuthOutcome {
    Connected(StoredToken),
    /// No cached token and no client secret to start a new flow with
    MissingCredentials,
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    client: Client,
    credentials_file: PathBuf,
    token_file: PathBuf,
    redirect_port: u16,
    timeout: Duration,
}

impl Authenticator {
    pub fn from_config(config: &DriveConfig) -> Self {
        Self {
            client: Client::new(),
            credentials_file: config.credentials_file.clone(),
            token_file: config.token_file.clone(),
            redirect_port: config.redirect_port,
            timeout: Duration::from_secs(config.oauth_timeout_secs),
        }
    }

    pub fn token_file(&self) -> &Path {
        &self.token_file
    }

    pub async fn authenticate(&self) -> AppResult<AuthOutcome> {
        let cached = StoredToken::load(&self.token_file).await?;

        let token = match cached {
            Some(token) if token.is_valid() => {
                info!("Using cached Google Drive token");
                return Ok(AuthOutcome::Connected(token));
            }
            Some(token) if token.can_refresh() => {
                info!("Cached Google Drive token expired, refreshing");
                self.refresh(&token).await?
            }
            _ => {
                if !fs::try_exists(&self.credentials_file).await? {
                    warn!(path = %self.credentials_file.display(), "Client secret file not found");
                    return Ok(AuthOutcome::MissingCredentials);
                }
                let secret = ClientSecret::load(&self.credentials_file).await?;
                self.authorize_interactive(&secret).await?
            }
        };

        token.save(&self.token_file).await?;
        Ok(AuthOutcome::Connected(token))
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh(&self, token: &StoredToken) -> AppResult<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| AppError::Auth("No refresh token available".to_string()))?;

        let response = self
            .request_token(
                &token.token_uri,
                &[
                    ("client_id", token.client_id.as_str()),
                    ("client_secret", token.client_secret.as_str()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;

        let mut refreshed = token.clone();
        refreshed.apply(response, Utc::now());
        info!("Refreshed Google Drive access token");
        Ok(refreshed)
    }

    async fn authorize_interactive(&self, secret: &ClientSecret) -> AppResult<StoredToken> {
        let listener = TcpListener::bind(("127.0.0.1", self.redirect_port)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{}/", port);
        let state = random_state();

        let auth_url = authorization_url(secret, &redirect_uri, &state)?;
        info!("Open this URL in a browser to authorize Google Drive access: {}", auth_url);

        let code = wait_for_code(listener, state, self.timeout).await?;
        let token = self.exchange_code(secret, &code, &redirect_uri).await?;
        info!("Google Drive authorization granted");
        Ok(token)
    }

    /// Trade the code from the consent redirect for the first token pair
    async fn exchange_code(
        &self,
        secret: &ClientSecret,
        code: &str,
        redirect_uri: &str,
    ) -> AppResult<StoredToken> {
        let response = self
            .request_token(
                &secret.token_uri,
                &[
                    ("code", code),
                    ("client_id", secret.client_id.as_str()),
                    ("client_secret", secret.client_secret.as_str()),
                    ("redirect_uri", redirect_uri),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await?;

        let mut token = StoredToken {
            token: None,
            refresh_token: None,
            token_uri: secret.token_uri.clone(),
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            scopes: vec![DRIVE_SCOPE.to_string()],
            expiry: None,
        };
        token.apply(response, Utc::now());
        Ok(token)
    }

    async fn request_token(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> AppResult<TokenResponse> {
        let response = self
            .client
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "Token endpoint error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)))
    }
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn authorization_url(secret: &ClientSecret, redirect_uri: &str, state: &str) -> AppResult<Url> {
    Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", DRIVE_SCOPE),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| AppError::Auth(format!("Invalid auth_uri: {}", e)))
}

/// Query string Google appends to the loopback redirect
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    /// `None` means the request was not an OAuth redirect (e.g. a bare `/`).
    fn outcome(self, expected_state: &str) -> Option<AppResult<String>> {
        if let Some(error) = self.error {
            return Some(Err(AppError::Auth(format!("Authorization denied: {}", error))));
        }
        let code = self.code?;
        if self.state.as_deref() != Some(expected_state) {
            return Some(Err(AppError::Auth("OAuth state mismatch".to_string())));
        }
        Some(Ok(code))
    }
}

type CodeSender = oneshot::Sender<AppResult<String>>;

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    sender: Arc<Mutex<Option<CodeSender>>>,
}

/// Serve the loopback redirect until it settles the consent or `timeout` elapses
async fn wait_for_code(
    listener: TcpListener,
    expected_state: String,
    timeout: Duration,
) -> AppResult<String> {
    let (result_tx, result_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route("/", get(oauth_callback))
        .with_state(CallbackState {
            expected_state: expected_state.into(),
            sender: Arc::new(Mutex::new(Some(result_tx))),
        });

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_rx.await.ok();
            })
            .await
    });

    let result = tokio::time::timeout(timeout, result_rx).await;

    shutdown_tx.send(()).ok();
    match server.await {
        Ok(Ok(())) => debug!("OAuth callback server stopped"),
        Ok(Err(e)) => warn!("OAuth callback server failed: {}", e),
        Err(e) => warn!("OAuth callback server task failed: {}", e),
    }

    match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => Err(AppError::Internal("OAuth callback channel closed".to_string())),
        Err(_) => Err(AppError::Auth("Timed out waiting for Google authorization".to_string())),
    }
}

async fn oauth_callback(
    State(callback): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<&'static str>) {
    let Some(outcome) = params.outcome(&callback.expected_state) else {
        return (StatusCode::NOT_FOUND, Html("Not found"));
    };
    debug!(success = outcome.is_ok(), "OAuth redirect received");

    let response = match &outcome {
        Ok(_) => (StatusCode::OK, Html(CALLBACK_PAGE)),
        Err(_) => (StatusCode::BAD_REQUEST, Html(FAILED_PAGE)),
    };
    if let Some(sender) = callback.sender.lock().await.take() {
        sender.send(outcome).ok();
    }
    response
}
