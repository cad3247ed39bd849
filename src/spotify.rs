//! Spotify Web API client
//!
//! Implements [`Catalog`] over the public REST endpoints: track search, current
//! user, playlist creation and playlist track additions.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::auth::Session;
use crate::catalog::{Catalog, CatalogError};
use crate::models::{CatalogTrack, CatalogUser, CreatedPlaylist, NewPlaylist};

const USER_AGENT: &str = concat!("ycd-reconcile/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Wire Models
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Paging<Option<TrackObject>>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: Option<String>, // Local files have no id
    name: String,
    artists: Vec<ArtistObject>,
    album: AlbumObject,
    uri: String,
    #[serde(default)]
    external_urls: ExternalUrls,
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistObject {
    id: String,
    name: String,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Serialize)]
struct AddTracksBody<'a> {
    uris: &'a [String],
}

impl From<TrackObject> for CatalogTrack {
    fn from(t: TrackObject) -> Self {
        CatalogTrack {
            id: t.id.unwrap_or_default(),
            name: t.name,
            artists: t.artists.into_iter().map(|a| a.name).collect(),
            album: t.album.name,
            uri: t.uri,
            external_url: t.external_urls.spotify.unwrap_or_default(),
            duration_ms: t.duration_ms,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Spotify Web API client
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    api_base: Url,
}

impl SpotifyClient {
    pub fn new(api_base: &str) -> Result<Self, CatalogError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| CatalogError::Network(format!("Invalid API base URL: {}", e)))?;
        if api_base.cannot_be_a_base() {
            return Err(CatalogError::Network(format!(
                "Invalid API base URL: {}",
                api_base
            )));
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http, api_base })
    }

    /// Base URL plus percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::Network(format!("Invalid API base URL: {}", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, session: &Session) -> Result<Response, CatalogError> {
        let response = request.bearer_auth(session.access_token()).send().await?;
        check_status(response).await
    }
}

/// Map non-success statuses onto [`CatalogError`].
async fn check_status(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 => Err(CatalogError::Unauthorized),
        429 => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            Err(CatalogError::RateLimited { retry_after })
        }
        code => {
            let body = response.text().await.unwrap_or_default();
            match code {
                403 => Err(CatalogError::Forbidden(body)),
                404 => Err(CatalogError::NotFound(body)),
                _ => Err(CatalogError::Api(code, body)),
            }
        }
    }
}

#[async_trait]
impl Catalog for SpotifyClient {
    async fn search_tracks(
        &self,
        session: &Session,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let url = self.endpoint(&["search"])?;
        debug!(query = %query, limit, "Searching Spotify");

        let limit = limit.to_string();
        let request = self
            .http
            .get(url)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())]);
        let response = self.send(request, session).await?;

        let body: SearchResponse = response.json().await?;
        Ok(body
            .tracks
            .items
            .into_iter()
            .flatten()
            .map(CatalogTrack::from)
            .collect())
    }

    async fn get_me(&self, session: &Session) -> Result<CatalogUser, CatalogError> {
        let url = self.endpoint(&["me"])?;
        let response = self.send(self.http.get(url), session).await?;
        Ok(response.json().await?)
    }

    async fn create_playlist(
        &self,
        session: &Session,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<CreatedPlaylist, CatalogError> {
        let url = self.endpoint(&["users", user_id, "playlists"])?;
        debug!(user_id = %user_id, name = %playlist.name, "Creating playlist");

        let response = self.send(self.http.post(url).json(playlist), session).await?;
        let created: PlaylistObject = response.json().await?;
        Ok(CreatedPlaylist {
            id: created.id,
            name: created.name,
            url: created.external_urls.spotify.unwrap_or_default(),
        })
    }

    async fn add_tracks_to_playlist(
        &self,
        session: &Session,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), CatalogError> {
        let url = self.endpoint(&["playlists", playlist_id, "tracks"])?;
        debug!(playlist_id = %playlist_id, count = uris.len(), "Adding tracks");

        self.send(self.http.post(url).json(&AddTracksBody { uris }), session)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = SpotifyClient::new("https://api.spotify.com/v1").unwrap();
        let url = client.endpoint(&["users", "a b/c", "playlists"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.spotify.com/v1/users/a%20b%2Fc/playlists"
        );
    }

    #[test]
    fn test_endpoint_trailing_slash_base() {
        let client = SpotifyClient::new("http://localhost:8080/v1/").unwrap();
        let url = client.endpoint(&["search"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v1/search");
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(SpotifyClient::new("not a url").is_err());
        assert!(SpotifyClient::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{
            "tracks": {
                "items": [
                    {
                        "id": "6ocbgoVGwYJhOv1GgI9NsF",
                        "name": "Gangnam Style (강남스타일)",
                        "artists": [{"name": "PSY", "id": "x"}],
                        "album": {"name": "PSY 6 (Six Rules), Part 1"},
                        "uri": "spotify:track:6ocbgoVGwYJhOv1GgI9NsF",
                        "external_urls": {"spotify": "https://open.spotify.com/track/6ocbgoVGwYJhOv1GgI9NsF"},
                        "duration_ms": 219493,
                        "popularity": 70
                    },
                    null
                ]
            }
        }"#;
        let body: SearchResponse = serde_json::from_str(json).unwrap();
        let tracks: Vec<CatalogTrack> = body
            .tracks
            .items
            .into_iter()
            .flatten()
            .map(CatalogTrack::from)
            .collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artists, vec!["PSY".to_string()]);
        assert_eq!(tracks[0].album, "PSY 6 (Six Rules), Part 1");
        assert_eq!(tracks[0].duration_ms, 219_493);
        assert!(tracks[0].external_url.starts_with("https://open.spotify.com"));
    }

    #[test]
    fn test_add_tracks_body_shape() {
        let uris = vec!["spotify:track:a".to_string()];
        let body = serde_json::to_value(AddTracksBody { uris: &uris }).unwrap();
        assert_eq!(body, serde_json::json!({"uris": ["spotify:track:a"]}));
    }
}
