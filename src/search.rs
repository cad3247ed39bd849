//! Catalog search with an ordered fallback chain.
//!
//! Each step builds one query from the guess, asks the catalog, and picks a
//! candidate from the results. The first step that picks something wins.
//!
//! | Step | Query                       | Limit | Pick                           |
//! |------|-----------------------------|-------|--------------------------------|
//! | 1    | `artist:{a} track:{t}`      | 3     | first                          |
//! | 2    | `{a} {t}`                   | 3     | first                          |
//! | 3    | `{t}`                       | 5     | first artist match, else first |
//! | 4    | punctuation-free `{a} {t}`  | 3     | first (only if terms changed)  |
//!
//! A rate-limited step backs off for the catalog's `Retry-After` before the
//! chain continues.

use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::catalog::{Catalog, CatalogError};
use crate::models::{CatalogTrack, SearchResult, SearchStrategy};
use crate::normalize::strip_punctuation;

/// Every attempted step failed, so "no match" cannot be claimed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Catalog rejected the access token")]
    Unauthorized,

    #[error("Catalog unavailable: {0}")]
    Unavailable(CatalogError),

    #[error("Search cancelled")]
    Cancelled,
}

/// One query formulation in the chain
pub struct StrategyStep {
    pub name: &'static str,
    pub limit: u32,
    /// `None` skips the step
    query: fn(&str, &str) -> Option<String>,
    select: fn(&str, Vec<CatalogTrack>) -> Option<SearchResult>,
}

/// Steps in the order they are tried
pub static STRATEGY_CHAIN: &[StrategyStep] = &[
    StrategyStep {
        name: "artist_track",
        limit: 3,
        query: artist_track_query,
        select: |_, tracks| first(tracks, SearchStrategy::ArtistTrack),
    },
    StrategyStep {
        name: "combined",
        limit: 3,
        query: combined_query,
        select: |_, tracks| first(tracks, SearchStrategy::Combined),
    },
    StrategyStep {
        name: "title",
        limit: 5,
        query: title_query,
        select: select_artist_match,
    },
    StrategyStep {
        name: "cleaned",
        limit: 3,
        query: cleaned_query,
        select: |_, tracks| first(tracks, SearchStrategy::CleanedTerms),
    },
];

// ============================================================================
// Queries
// ============================================================================

fn artist_track_query(artist: &str, title: &str) -> Option<String> {
    Some(format!("artist:{} track:{}", artist, title))
}

fn combined_query(artist: &str, title: &str) -> Option<String> {
    Some(format!("{} {}", artist, title))
}

fn title_query(_artist: &str, title: &str) -> Option<String> {
    Some(title.to_string())
}

/// Only worth a request when stripping punctuation changed something
fn cleaned_query(artist: &str, title: &str) -> Option<String> {
    let clean_artist = strip_punctuation(artist);
    let clean_title = strip_punctuation(title);
    if clean_artist == artist && clean_title == title {
        return None;
    }
    Some(format!("{} {}", clean_artist, clean_title))
}

// ============================================================================
// Selection
// ============================================================================

fn first(tracks: Vec<CatalogTrack>, strategy: SearchStrategy) -> Option<SearchResult> {
    tracks
        .into_iter()
        .next()
        .map(|track| SearchResult::found(track, strategy))
}

/// Loose artist check used by the title-only step.
///
/// Matches when the credited artists contain the target, or the target
/// contains the first credited word ("Guetta" vs "David Guetta feat. Sia").
pub fn artist_matches(candidate: &CatalogTrack, artist: &str) -> bool {
    let target = artist.to_lowercase();
    let credited = candidate
        .artists
        .iter()
        .map(|a| a.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    if credited.contains(&target) {
        return true;
    }
    match credited.split(' ').next() {
        Some(word) if !word.is_empty() => target.contains(word),
        _ => false,
    }
}

fn select_artist_match(artist: &str, tracks: Vec<CatalogTrack>) -> Option<SearchResult> {
    if let Some(pos) = tracks.iter().position(|t| artist_matches(t, artist)) {
        let track = tracks.into_iter().nth(pos)?;
        return Some(SearchResult::found(track, SearchStrategy::TitleArtistMatch));
    }
    first(tracks, SearchStrategy::TitleOnly)
}

// ============================================================================
// Search
// ============================================================================

/// Sleep for `wait` unless `cancel` fires first. Returns false when cancelled.
pub async fn pause(wait: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(wait) => true,
    }
}

/// Find the best catalog candidate for one artist/title guess.
///
/// A failing step counts as a miss and the chain moves on. Only when every
/// attempted step failed is an error returned: `Unauthorized` if any step had
/// its token rejected, `Unavailable` otherwise. A rate-limited step waits
/// [`CatalogError::retry_wait`] first; `cancel` cuts that wait short.
pub async fn search_track(
    catalog: &dyn Catalog,
    session: &Session,
    artist: &str,
    title: &str,
    cancel: &CancellationToken,
) -> Result<SearchResult, SearchError> {
    let mut attempted = 0usize;
    let mut failed = 0usize;
    let mut auth_failed = false;
    let mut last_error = None;

    for step in STRATEGY_CHAIN {
        let Some(query) = (step.query)(artist, title) else {
            debug!(step = step.name, "Skipping step, terms already clean");
            continue;
        };

        attempted += 1;
        match catalog.search_tracks(session, &query, step.limit).await {
            Ok(tracks) => {
                if let Some(result) = (step.select)(artist, tracks) {
                    if let Some(strategy) = result.strategy_used() {
                        info!(artist = %artist, title = %title, strategy = %strategy, "Match found");
                    }
                    return Ok(result);
                }
                debug!(step = step.name, query = %query, "No results");
            }
            Err(e) => {
                warn!(step = step.name, query = %query, error = %e, "Search step failed");
                failed += 1;
                auth_failed |= e.is_auth();
                if let Some(wait) = e.retry_wait() {
                    info!(wait_ms = wait.as_millis() as u64, "Rate limited, backing off");
                    if !pause(wait, cancel).await {
                        return Err(SearchError::Cancelled);
                    }
                }
                last_error = Some(e);
            }
        }
    }

    if attempted > 0 && failed == attempted {
        if auth_failed {
            return Err(SearchError::Unauthorized);
        }
        if let Some(e) = last_error {
            return Err(SearchError::Unavailable(e));
        }
    }

    info!(artist = %artist, title = %title, "No match");
    Ok(SearchResult::none())
}
