//! Turn selected matches into a new catalog playlist.

use tracing::{debug, info};

use crate::auth::Session;
use crate::catalog::{Catalog, MAX_URIS_PER_ADD};
use crate::error::{ReconcileError, Result};
use crate::models::{AnnotatedTrack, NewPlaylist, PlaylistSummary};

pub const MAX_PLAYLIST_NAME_CHARS: usize = 100;
pub const MAX_SELECTED_TRACKS: usize = 1000;
pub const PLAYLIST_DESCRIPTION: &str = "Created with YCD Reconcile";

const FORBIDDEN_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Trim a playlist name and reject anything the catalog or a file system
/// would choke on. Every violation is reported.
pub fn validate_playlist_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let mut errors = Vec::new();

    if trimmed.is_empty() {
        errors.push("Playlist name cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_PLAYLIST_NAME_CHARS {
        errors.push(format!(
            "Playlist name cannot exceed {} characters",
            MAX_PLAYLIST_NAME_CHARS
        ));
    }
    if trimmed
        .chars()
        .any(|c| FORBIDDEN_NAME_CHARS.contains(&c) || c.is_control())
    {
        errors.push("Playlist name contains invalid characters".to_string());
    }

    if errors.is_empty() {
        Ok(trimmed.to_string())
    } else {
        Err(ReconcileError::InvalidPlaylist(errors))
    }
}

/// URIs of selected tracks with a candidate, in playlist order.
pub fn selected_uris(tracks: &[AnnotatedTrack]) -> Result<Vec<String>> {
    let uris: Vec<String> = tracks
        .iter()
        .filter_map(|t| t.selected_uri().map(str::to_string))
        .collect();

    let mut errors = Vec::new();
    if uris.is_empty() {
        errors.push("At least one track must be selected".to_string());
    }
    if uris.len() > MAX_SELECTED_TRACKS {
        errors.push(format!(
            "Too many tracks selected (maximum {})",
            MAX_SELECTED_TRACKS
        ));
    }

    if errors.is_empty() {
        Ok(uris)
    } else {
        Err(ReconcileError::InvalidPlaylist(errors))
    }
}

/// Create a playlist for the session's user and fill it with the selection.
///
/// Tracks are added in chunks of [`MAX_URIS_PER_ADD`]. A failing chunk stops
/// the run; the playlist already exists at that point.
pub async fn create_playlist(
    catalog: &dyn Catalog,
    session: &Session,
    name: &str,
    tracks: &[AnnotatedTrack],
    public: bool,
) -> Result<PlaylistSummary> {
    if !session.has_token() {
        return Err(ReconcileError::AuthRequired);
    }
    let name = validate_playlist_name(name)?;
    let uris = selected_uris(tracks)?;

    let user = catalog.get_me(session).await?;
    debug!(user_id = %user.id, "Resolved current user");

    let request = NewPlaylist {
        name,
        description: PLAYLIST_DESCRIPTION.to_string(),
        public,
    };
    let created = catalog.create_playlist(session, &user.id, &request).await?;
    info!(playlist_id = %created.id, name = %created.name, "Created playlist");

    let mut tracks_added = 0;
    for chunk in uris.chunks(MAX_URIS_PER_ADD) {
        catalog
            .add_tracks_to_playlist(session, &created.id, chunk)
            .await?;
        tracks_added += chunk.len();
        debug!(added = tracks_added, total = uris.len(), "Added tracks");
    }

    info!(playlist_id = %created.id, tracks_added, "Playlist filled");
    Ok(PlaylistSummary {
        id: created.id,
        name: created.name,
        url: created.url,
        tracks_added,
        total_selected: uris.len(),
    })
}
