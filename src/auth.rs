//! Spotify OAuth: authorize URL, code exchange, refresh, client credentials.
//!
//! Tokens are returned to the caller as a [`Session`] and never stored here.
//! Every catalog call takes the session explicitly, so several users can be
//! served by one process.

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::catalog::CatalogError;
use crate::config::OAuthConfig;
use crate::error::{ReconcileError, Result};

/// Scopes needed to read the profile and write public/private playlists
pub const SCOPES: &[&str] = &[
    "playlist-modify-public",
    "playlist-modify-private",
    "user-read-private",
    "user-read-email",
];

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Credential context for catalog calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<u64>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Session that can only be refreshed, not used for catalog calls
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: Some(refresh_token.into()),
            expires_at: None,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    /// A session with a blank token cannot authenticate anything
    pub fn has_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    pub fn is_expired_at(&self, now_unix: u64) -> bool {
        self.expires_at.is_some_and(|t| now_unix >= t)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_session(self, previous_refresh: Option<&str>, now_unix: u64) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: self.expires_in.map(|secs| now_unix + secs),
        }
    }
}

/// Check an authorization code before sending it to the token endpoint.
pub fn validate_auth_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    let mut errors = Vec::new();
    if trimmed.is_empty() {
        errors.push("Authorization code cannot be empty".to_string());
    } else if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        errors.push("Invalid authorization code format".to_string());
    }

    if errors.is_empty() {
        Ok(trimmed.to_string())
    } else {
        Err(ReconcileError::Config(errors))
    }
}

/// URL the user opens to grant access.
pub fn authorize_url(config: &OAuthConfig, state: Option<&str>) -> Result<Url> {
    let redirect = config.redirect_uri.as_ref().ok_or_else(|| {
        ReconcileError::Config(vec![
            "Missing required environment variable: SPOTIFY_REDIRECT_URI".to_string(),
        ])
    })?;

    let mut url = config
        .accounts_base
        .join("authorize")
        .map_err(|e| ReconcileError::Config(vec![format!("Bad accounts URL: {}", e)]))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect.as_str())
            .append_pair("scope", &SCOPES.join(" "));
        if let Some(state) = state {
            query.append_pair("state", state);
        }
    }
    Ok(url)
}

/// Client for the accounts service token endpoint.
pub struct AuthClient {
    http: Client,
    config: OAuthConfig,
}

impl AuthClient {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(TOKEN_TIMEOUT)
            .build()
            .map_err(CatalogError::from)?;
        Ok(Self { http, config })
    }

    fn token_url(&self) -> Result<Url> {
        self.config
            .accounts_base
            .join("api/token")
            .map_err(|e| ReconcileError::Config(vec![format!("Bad accounts URL: {}", e)]))
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let url = self.token_url()?;
        let grant_type = form.first().map(|(_, v)| *v).unwrap_or_default();
        debug!(url = %url, grant_type, "Requesting token");

        let response = self
            .http
            .post(url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(form)
            .send()
            .await
            .map_err(CatalogError::from)?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(CatalogError::Unauthorized.into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), body).into());
        }

        let token: TokenResponse = response.json().await.map_err(CatalogError::from)?;
        Ok(token)
    }

    /// Trade the code from the redirect for a user session.
    pub async fn exchange_code(&self, code: &str) -> Result<Session> {
        let code = validate_auth_code(code)?;
        let redirect = self
            .config
            .redirect_uri
            .as_ref()
            .map(|u| u.as_str().to_string())
            .ok_or_else(|| {
                ReconcileError::Config(vec![
                    "Missing required environment variable: SPOTIFY_REDIRECT_URI".to_string(),
                ])
            })?;

        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", &code),
                ("redirect_uri", &redirect),
            ])
            .await?;
        info!("Exchanged authorization code for access token");
        Ok(token.into_session(None, unix_now()))
    }

    /// New access token for an existing session. Keeps the old refresh token
    /// when the service does not rotate it.
    pub async fn refresh(&self, session: &Session) -> Result<Session> {
        let refresh_token = session
            .refresh_token()
            .ok_or_else(|| ReconcileError::Config(vec!["No refresh token available".to_string()]))?;

        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        info!("Refreshed access token");
        Ok(token.into_session(Some(refresh_token), unix_now()))
    }

    /// App-only session. Good for search, not for creating playlists.
    pub async fn client_credentials(&self) -> Result<Session> {
        let token = self
            .request_token(&[("grant_type", "client_credentials")])
            .await?;
        Ok(token.into_session(None, unix_now()))
    }
}
