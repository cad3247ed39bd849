//! Sequential, rate-limited batch search.
//!
//! Guesses are searched one at a time with a fixed pause between consecutive
//! searches. A rate-limited catalog stretches that pause (see
//! [`crate::search::search_track`]). A cancelled batch keeps everything
//! computed so far.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::Session;
use crate::catalog::Catalog;
use crate::error::{ReconcileError, Result};
use crate::models::{AnnotatedTrack, BatchStats, SearchResult, SearchStatus, TrackGuess};
use crate::scoring::confidence_score;
use crate::search::{pause, search_track, SearchError};

/// Pause between consecutive catalog searches
pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub delay: Duration,
    /// Found tracks at or above this confidence start out selected
    pub auto_select_threshold: u8,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_SEARCH_DELAY,
            auto_select_threshold: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub tracks: Vec<AnnotatedTrack>,
    pub stats: BatchStats,
    pub cancelled: bool,
}

/// Attach search outcome and confidence to a guess.
pub fn annotate(guess: TrackGuess, result: SearchResult, auto_select_threshold: u8) -> AnnotatedTrack {
    let confidence = confidence_score(&guess, result.candidate(), result.strategy_used());
    let found = result.is_found();
    AnnotatedTrack {
        guess,
        result,
        confidence,
        selected: found && confidence >= auto_select_threshold,
        search_status: if found {
            SearchStatus::Found
        } else {
            SearchStatus::NotFound
        },
    }
}

/// Search every guess in order.
///
/// `on_progress(done, total, track)` runs after each track. Errors:
/// - `AuthRequired` when the session has no token, or the catalog rejects it
/// - `SearchUnavailable` when the catalog failed for every searched track
pub async fn search_batch<F>(
    catalog: &dyn Catalog,
    session: &Session,
    guesses: Vec<TrackGuess>,
    options: &BatchOptions,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<BatchOutcome>
where
    F: FnMut(usize, usize, &AnnotatedTrack),
{
    if !session.has_token() {
        return Err(ReconcileError::AuthRequired);
    }

    let start = Instant::now();
    let total = guesses.len();
    let mut stats = BatchStats::new(total);
    let mut tracks = Vec::with_capacity(total);
    let mut cancelled = false;
    let mut last_unavailable = None;

    for (i, guess) in guesses.into_iter().enumerate() {
        if i > 0 && !options.delay.is_zero() {
            pause(options.delay, cancel).await;
        }
        if cancel.is_cancelled() {
            info!(done = i, total, "Batch cancelled");
            cancelled = true;
            break;
        }

        let searched = search_track(catalog, session, &guess.artist, &guess.title, cancel).await;
        let result = match searched {
            Ok(result) => result,
            Err(SearchError::Cancelled) => {
                info!(done = i, total, "Batch cancelled during back-off");
                cancelled = true;
                break;
            }
            Err(SearchError::Unauthorized) => {
                warn!(path = %guess.original_path, "Access token rejected, aborting batch");
                return Err(ReconcileError::AuthRequired);
            }
            Err(SearchError::Unavailable(e)) => {
                warn!(path = %guess.original_path, error = %e, "Catalog unavailable for track");
                stats.record_unavailable();
                last_unavailable = Some(e);
                SearchResult::none()
            }
        };

        let track = annotate(guess, result, options.auto_select_threshold);
        stats.record(&track);
        on_progress(i + 1, total, &track);
        tracks.push(track);
    }

    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    if stats.searched > 0 && stats.unavailable == stats.searched {
        let reason = last_unavailable
            .map(|e| e.to_string())
            .unwrap_or_default();
        return Err(ReconcileError::SearchUnavailable(reason));
    }

    info!(
        searched = stats.searched,
        found = stats.found,
        unavailable = stats.unavailable,
        cancelled,
        "Batch complete"
    );
    Ok(BatchOutcome {
        tracks,
        stats,
        cancelled,
    })
}
