//! Contract for the external music catalog.
//!
//! The search strategy, batch pipeline and playlist creation only talk to
//! this trait. [`crate::spotify::SpotifyClient`] is the production
//! implementation; tests use in-memory stubs.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::auth::Session;
use crate::models::{CatalogTrack, CatalogUser, CreatedPlaylist, NewPlaylist};

/// Most URIs the catalog accepts in one add-tracks call
pub const MAX_URIS_PER_ADD: usize = 100;

/// Back-off when a 429 carries no `Retry-After`
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Longest back-off honoured for a single 429
pub const MAX_RETRY_WAIT: Duration = Duration::from_secs(30);

/// Catalog client errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Access token rejected or expired")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Decode(String),
}

impl CatalogError {
    /// True when retrying with the same credentials cannot help
    pub fn is_auth(&self) -> bool {
        matches!(self, CatalogError::Unauthorized)
    }

    /// How long to back off before the next request, for rate-limit errors.
    /// Capped at [`MAX_RETRY_WAIT`].
    pub fn retry_wait(&self) -> Option<Duration> {
        match self {
            CatalogError::RateLimited { retry_after } => Some(
                retry_after
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_RETRY_WAIT)
                    .min(MAX_RETRY_WAIT),
            ),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CatalogError::Decode(e.to_string())
        } else {
            CatalogError::Network(e.to_string())
        }
    }
}

/// Operations the pipeline needs from the catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Free-text track search, at most `limit` results in relevance order.
    async fn search_tracks(
        &self,
        session: &Session,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CatalogTrack>, CatalogError>;

    /// The user the session belongs to
    async fn get_me(&self, session: &Session) -> Result<CatalogUser, CatalogError>;

    async fn create_playlist(
        &self,
        session: &Session,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<CreatedPlaylist, CatalogError>;

    /// Append tracks. Callers chunk to [`MAX_URIS_PER_ADD`].
    async fn add_tracks_to_playlist(
        &self,
        session: &Session,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_wait() {
        let limited = |secs| CatalogError::RateLimited { retry_after: secs };
        assert_eq!(limited(Some(2)).retry_wait(), Some(Duration::from_secs(2)));
        assert_eq!(limited(None).retry_wait(), Some(DEFAULT_RETRY_WAIT));
        assert_eq!(limited(Some(3600)).retry_wait(), Some(MAX_RETRY_WAIT));
        assert_eq!(CatalogError::Unauthorized.retry_wait(), None);
        assert_eq!(CatalogError::Api(503, "down".to_string()).retry_wait(), None);
    }
}
