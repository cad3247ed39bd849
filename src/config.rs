//! Spotify credentials and endpoints, from flags or the environment.
//!
//! Every binary flattens [`SpotifyArgs`] into its own clap parser, so
//! `SPOTIFY_*` variables (or a `.env` file) work the same everywhere.

use clap::Args;
use reqwest::Url;
use tracing_subscriber::EnvFilter;

use crate::auth::Session;
use crate::error::{ReconcileError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "ycd_reconcile=info";

#[derive(Args, Debug, Clone)]
pub struct SpotifyArgs {
    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long, env = "SPOTIFY_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// User access token (from `spotify-auth exchange`)
    #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, env = "SPOTIFY_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, env = "SPOTIFY_ACCOUNTS_BASE", default_value = DEFAULT_ACCOUNTS_BASE)]
    pub accounts_base: String,
}

/// Validated settings for the OAuth endpoints.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<Url>,
    pub accounts_base: Url,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SpotifyArgs {
    /// Check credentials for the OAuth flows. Collects every problem instead of
    /// stopping at the first one.
    pub fn oauth_config(&self, require_redirect: bool) -> Result<OAuthConfig> {
        let mut errors = Vec::new();

        let client_id = non_empty(&self.client_id);
        if client_id.is_none() {
            errors.push("Missing required environment variable: SPOTIFY_CLIENT_ID".to_string());
        }
        let client_secret = non_empty(&self.client_secret);
        if client_secret.is_none() {
            errors.push("Missing required environment variable: SPOTIFY_CLIENT_SECRET".to_string());
        }

        let redirect_uri = match non_empty(&self.redirect_uri) {
            Some(raw) => match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(_) => {
                    errors.push("SPOTIFY_REDIRECT_URI must be a valid URL".to_string());
                    None
                }
            },
            None => {
                if require_redirect {
                    errors.push(
                        "Missing required environment variable: SPOTIFY_REDIRECT_URI".to_string(),
                    );
                }
                None
            }
        };

        let accounts_base = match Url::parse(&self.accounts_base) {
            Ok(url) => Some(url),
            Err(_) => {
                errors.push("SPOTIFY_ACCOUNTS_BASE must be a valid URL".to_string());
                None
            }
        };

        match (client_id, client_secret, accounts_base) {
            (Some(id), Some(secret), Some(accounts_base)) if errors.is_empty() => Ok(OAuthConfig {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
                redirect_uri,
                accounts_base,
            }),
            _ => Err(ReconcileError::Config(errors)),
        }
    }

    /// Session built from the configured access token.
    pub fn session(&self) -> Result<Session> {
        non_empty(&self.access_token)
            .map(Session::new)
            .ok_or(ReconcileError::AuthRequired)
    }
}

/// Load `.env` if there is one. Missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Install the fmt subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
