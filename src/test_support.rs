// Test support: an in-memory catalog that records every call

use crate::auth::Session;
use crate::catalog::{Catalog, CatalogError};
use crate::models::{CatalogTrack, CatalogUser, CreatedPlaylist, NewPlaylist};
use std::collections::HashMap;
use std::sync::Mutex;

/// Build a catalog track with a derived id/uri
pub fn track(id: &str, name: &str, artists: &[&str]) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        name: name.to_string(),
        artists: artists.iter().map(|a| a.to_string()).collect(),
        album: format!("{} (album)", name),
        uri: format!("spotify:track:{}", id),
        external_url: format!("https://open.spotify.com/track/{}", id),
        duration_ms: 200_000,
    }
}

/// Mock catalog for testing
///
/// Search answers are keyed by exact query string. Unknown queries return an
/// empty result, or `fallback_error` when one is set.
#[derive(Default)]
pub struct StubCatalog {
    responses: HashMap<String, Result<Vec<CatalogTrack>, CatalogError>>,
    fallback_error: Option<CatalogError>,
    pub queries: Mutex<Vec<(String, u32)>>,
    pub created: Mutex<Vec<(String, NewPlaylist)>>,
    pub added: Mutex<Vec<(String, Vec<String>)>>,
    fail_adds_after: Option<usize>,
}

impl StubCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, tracks: Vec<CatalogTrack>) -> Self {
        self.responses.insert(query.to_string(), Ok(tracks));
        self
    }

    pub fn with_error(mut self, query: &str, error: CatalogError) -> Self {
        self.responses.insert(query.to_string(), Err(error));
        self
    }

    pub fn failing(mut self, error: CatalogError) -> Self {
        self.fallback_error = Some(error);
        self
    }

    /// Let the first `n` add-tracks calls succeed, fail the rest
    pub fn failing_adds_after(mut self, n: usize) -> Self {
        self.fail_adds_after = Some(n);
        self
    }

    pub fn issued_queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|(q, _)| q.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Catalog for StubCatalog {
    async fn search_tracks(
        &self,
        _session: &Session,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), limit));

        match self.responses.get(query) {
            Some(Ok(tracks)) => Ok(tracks.iter().take(limit as usize).cloned().collect()),
            Some(Err(e)) => Err(e.clone()),
            None => match &self.fallback_error {
                Some(e) => Err(e.clone()),
                None => Ok(Vec::new()),
            },
        }
    }

    async fn get_me(&self, session: &Session) -> Result<CatalogUser, CatalogError> {
        if !session.has_token() {
            return Err(CatalogError::Unauthorized);
        }
        Ok(CatalogUser {
            id: "test-user".to_string(),
            display_name: Some("Test User".to_string()),
        })
    }

    async fn create_playlist(
        &self,
        _session: &Session,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<CreatedPlaylist, CatalogError> {
        let mut created = self.created.lock().unwrap();
        created.push((user_id.to_string(), playlist.clone()));
        let id = format!("playlist{}", created.len());
        Ok(CreatedPlaylist {
            url: format!("https://open.spotify.com/playlist/{}", id),
            id,
            name: playlist.name.clone(),
        })
    }

    async fn add_tracks_to_playlist(
        &self,
        _session: &Session,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), CatalogError> {
        let mut added = self.added.lock().unwrap();
        if self.fail_adds_after.is_some_and(|n| added.len() >= n) {
            return Err(CatalogError::Api(500, "boom".to_string()));
        }
        added.push((playlist_id.to_string(), uris.to_vec()));
        Ok(())
    }
}
