//! Core data models for the reconciliation pipeline.
//!
//! This module contains the struct definitions and enums that flow between
//! the parser, the catalog search strategy, the scorer and playlist creation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::scoring::ConfidenceLevel;

/// Artist used when neither the file name nor the folders name one.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

// ============================================================================
// Parsed Models
// ============================================================================

/// Artist/title guess reconstructed from one line of a YCD export.
/// Artist and title are never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackGuess {
    pub artist: String,
    pub title: String,
    pub original_path: String,
}

// ============================================================================
// Catalog Models
// ============================================================================

/// Track as returned by the external catalog. Read-only from our side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>, // Credited order
    pub album: String,
    pub uri: String,          // e.g. "spotify:track:2takcwOaAZWiXQijPHIx7B"
    pub external_url: String, // Browser link
    pub duration_ms: u64,
}

impl CatalogTrack {
    /// Credited artists joined the way they are displayed: "A, B, C"
    pub fn joined_artists(&self) -> String {
        self.artists.join(", ")
    }
}

/// One query formulation in the ordered search fallback chain.
///
/// The serialized labels are stable and appear in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SearchStrategy {
    #[serde(rename = "artist:track search")]
    ArtistTrack,
    #[serde(rename = "combined search")]
    Combined,
    #[serde(rename = "title search + artist matching")]
    TitleArtistMatch,
    #[serde(rename = "title-only search (no artist match)")]
    TitleOnly,
    #[serde(rename = "cleaned search terms")]
    CleanedTerms,
}

impl SearchStrategy {
    pub fn label(self) -> &'static str {
        match self {
            SearchStrategy::ArtistTrack => "artist:track search",
            SearchStrategy::Combined => "combined search",
            SearchStrategy::TitleArtistMatch => "title search + artist matching",
            SearchStrategy::TitleOnly => "title-only search (no artist match)",
            SearchStrategy::CleanedTerms => "cleaned search terms",
        }
    }

    /// Look up a strategy by its report label. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        [
            SearchStrategy::ArtistTrack,
            SearchStrategy::Combined,
            SearchStrategy::TitleArtistMatch,
            SearchStrategy::TitleOnly,
            SearchStrategy::CleanedTerms,
        ]
        .into_iter()
        .find(|s| s.label() == label)
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of searching one guess.
///
/// `candidate` is `Some` exactly when `strategy_used` is `Some`; construct via
/// [`SearchResult::found`] or [`SearchResult::none`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SearchResultFields")]
pub struct SearchResult {
    candidate: Option<CatalogTrack>,
    strategy_used: Option<SearchStrategy>,
}

/// Serialized form of [`SearchResult`], checked on the way in
#[derive(Deserialize)]
pub struct SearchResultFields {
    candidate: Option<CatalogTrack>,
    strategy_used: Option<SearchStrategy>,
}

impl TryFrom<SearchResultFields> for SearchResult {
    type Error = &'static str;

    fn try_from(fields: SearchResultFields) -> Result<Self, Self::Error> {
        match (fields.candidate, fields.strategy_used) {
            (Some(candidate), Some(strategy)) => Ok(SearchResult::found(candidate, strategy)),
            (None, None) => Ok(SearchResult::none()),
            _ => Err("candidate and strategy_used must be set together"),
        }
    }
}

impl SearchResult {
    pub fn found(candidate: CatalogTrack, strategy: SearchStrategy) -> Self {
        Self {
            candidate: Some(candidate),
            strategy_used: Some(strategy),
        }
    }

    pub fn none() -> Self {
        Self {
            candidate: None,
            strategy_used: None,
        }
    }

    pub fn candidate(&self) -> Option<&CatalogTrack> {
        self.candidate.as_ref()
    }

    pub fn strategy_used(&self) -> Option<SearchStrategy> {
        self.strategy_used
    }

    pub fn is_found(&self) -> bool {
        self.candidate.is_some()
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// Search progress of a single track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Pending,
    Found,
    NotFound,
}

/// Guess + search outcome + confidence, handed to the selection step.
/// `selected` is the only field expected to change after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedTrack {
    #[serde(flatten)]
    pub guess: TrackGuess,
    #[serde(flatten)]
    pub result: SearchResult,
    pub confidence: u8, // 0-100
    pub selected: bool,
    pub search_status: SearchStatus,
}

impl AnnotatedTrack {
    /// Track that has not been searched yet (upload preview).
    pub fn pending(guess: TrackGuess) -> Self {
        Self {
            guess,
            result: SearchResult::none(),
            confidence: 0,
            selected: false,
            search_status: SearchStatus::Pending,
        }
    }

    /// Catalog URI when this track is selected and has a candidate
    pub fn selected_uri(&self) -> Option<&str> {
        if !self.selected {
            return None;
        }
        self.result.candidate().map(|c| c.uri.as_str())
    }
}

/// Result of playlist creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub url: String,
    pub tracks_added: usize,
    pub total_selected: usize,
}

/// Catalog user, as much as playlist creation needs
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CatalogUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Newly created remote playlist
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedPlaylist {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// Playlist creation request body
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
    pub public: bool,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Confidence buckets matching [`ConfidenceLevel`]
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceDistribution {
    pub excellent: usize,
    pub very_good: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

impl ConfidenceDistribution {
    pub fn record(&mut self, confidence: u8) {
        match ConfidenceLevel::from_score(confidence) {
            ConfidenceLevel::Excellent => self.excellent += 1,
            ConfidenceLevel::VeryGood => self.very_good += 1,
            ConfidenceLevel::Good => self.good += 1,
            ConfidenceLevel::Fair => self.fair += 1,
            ConfidenceLevel::Poor => self.poor += 1,
        }
    }
}

/// Per-batch matching statistics.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_tracks: usize,
    pub searched: usize,
    pub found: usize,
    pub not_found: usize,
    pub unavailable: usize, // Every strategy step failed in transport
    pub selected: usize,

    /// Hits keyed by strategy label
    pub by_strategy: BTreeMap<String, usize>,

    /// Only tracks with a candidate contribute
    pub confidence: ConfidenceDistribution,
    pub confidence_sum: u64,

    pub elapsed_seconds: f64,
}

impl BatchStats {
    pub fn new(total_tracks: usize) -> Self {
        Self {
            total_tracks,
            ..Self::default()
        }
    }

    pub fn record(&mut self, track: &AnnotatedTrack) {
        self.searched += 1;
        match track.result.strategy_used() {
            Some(strategy) => {
                self.found += 1;
                *self.by_strategy.entry(strategy.label().to_string()).or_default() += 1;
                self.confidence.record(track.confidence);
                self.confidence_sum += u64::from(track.confidence);
            }
            None => self.not_found += 1,
        }
        if track.selected {
            self.selected += 1;
        }
    }

    pub fn record_unavailable(&mut self) {
        self.unavailable += 1;
    }

    /// Rounded mean confidence over found tracks
    pub fn average_confidence(&self) -> u8 {
        if self.found == 0 {
            0
        } else {
            (self.confidence_sum as f64 / self.found as f64).round() as u8
        }
    }

    /// Calculate match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.searched == 0 {
            0.0
        } else {
            100.0 * self.found as f64 / self.searched as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }
}

/// JSON report written by `ycd-match` and read back by `ycd-playlist`.
/// Users flip `selected` in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub source: String,
    pub cancelled: bool,
    pub tracks: Vec<AnnotatedTrack>,
    pub stats: BatchStats,
}

impl MatchReport {
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Re-derive `selected` from a new confidence threshold
    pub fn reselect(&mut self, min_confidence: u8) {
        for track in &mut self.tracks {
            track.selected = track.result.is_found() && track.confidence >= min_confidence;
        }
        self.stats.selected = self.tracks.iter().filter(|t| t.selected).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> CatalogTrack {
        CatalogTrack {
            id: "abc".to_string(),
            name: "Gangnam Style".to_string(),
            artists: vec!["PSY".to_string(), "Guest".to_string()],
            album: "PSY 6".to_string(),
            uri: "spotify:track:abc".to_string(),
            external_url: "https://open.spotify.com/track/abc".to_string(),
            duration_ms: 219_000,
        }
    }

    fn sample_guess() -> TrackGuess {
        TrackGuess {
            artist: "PSY".to_string(),
            title: "Gangnam Style".to_string(),
            original_path: "PSY - Gangnam Style.mp3".to_string(),
        }
    }

    #[test]
    fn test_joined_artists() {
        assert_eq!(sample_track().joined_artists(), "PSY, Guest");
    }

    #[test]
    fn test_strategy_labels_round_trip() {
        for s in [
            SearchStrategy::ArtistTrack,
            SearchStrategy::Combined,
            SearchStrategy::TitleArtistMatch,
            SearchStrategy::TitleOnly,
            SearchStrategy::CleanedTerms,
        ] {
            assert_eq!(SearchStrategy::from_label(s.label()), Some(s));
        }
        assert_eq!(SearchStrategy::from_label("no match"), None);
    }

    #[test]
    fn test_strategy_serializes_as_label() {
        let json = serde_json::to_string(&SearchStrategy::TitleOnly).unwrap();
        assert_eq!(json, "\"title-only search (no artist match)\"");
    }

    #[test]
    fn test_search_result_invariant() {
        let none = SearchResult::none();
        assert!(none.candidate().is_none() && none.strategy_used().is_none());

        let found = SearchResult::found(sample_track(), SearchStrategy::Combined);
        assert!(found.candidate().is_some() && found.strategy_used().is_some());
        assert!(found.is_found());
    }

    #[test]
    fn test_selected_uri_requires_selection_and_candidate() {
        let mut track = AnnotatedTrack {
            guess: sample_guess(),
            result: SearchResult::found(sample_track(), SearchStrategy::ArtistTrack),
            confidence: 100,
            selected: false,
            search_status: SearchStatus::Found,
        };
        assert_eq!(track.selected_uri(), None);
        track.selected = true;
        assert_eq!(track.selected_uri(), Some("spotify:track:abc"));

        let mut pending = AnnotatedTrack::pending(sample_guess());
        pending.selected = true;
        assert_eq!(pending.selected_uri(), None);
    }

    #[test]
    fn test_annotated_track_json_shape() {
        let track = AnnotatedTrack {
            guess: sample_guess(),
            result: SearchResult::found(sample_track(), SearchStrategy::ArtistTrack),
            confidence: 100,
            selected: true,
            search_status: SearchStatus::Found,
        };
        let value = serde_json::to_value(&track).unwrap();
        assert_eq!(value["artist"], "PSY");
        assert_eq!(value["strategy_used"], "artist:track search");
        assert_eq!(value["candidate"]["uri"], "spotify:track:abc");
        assert_eq!(value["search_status"], "found");

        let back: AnnotatedTrack = serde_json::from_value(value).unwrap();
        assert_eq!(back, track);
    }

    #[test]
    fn test_batch_stats_record() {
        let mut stats = BatchStats::new(3);
        stats.record(&AnnotatedTrack {
            guess: sample_guess(),
            result: SearchResult::found(sample_track(), SearchStrategy::ArtistTrack),
            confidence: 95,
            selected: true,
            search_status: SearchStatus::Found,
        });
        stats.record(&AnnotatedTrack {
            guess: sample_guess(),
            result: SearchResult::found(sample_track(), SearchStrategy::TitleOnly),
            confidence: 50,
            selected: true,
            search_status: SearchStatus::Found,
        });
        stats.record(&AnnotatedTrack {
            search_status: SearchStatus::NotFound,
            ..AnnotatedTrack::pending(sample_guess())
        });

        assert_eq!(stats.searched, 3);
        assert_eq!(stats.found, 2);
        assert_eq!(stats.not_found, 1);
        assert_eq!(stats.selected, 2);
        assert_eq!(stats.average_confidence(), 73); // (95 + 50) / 2 = 72.5
        assert_eq!(stats.confidence.excellent, 1);
        assert_eq!(stats.confidence.fair, 1);
        assert_eq!(stats.by_strategy.get("artist:track search"), Some(&1));
        assert!((stats.match_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_half_set_search_result_rejected() {
        let json = serde_json::json!({
            "artist": "PSY",
            "title": "Gangnam Style",
            "original_path": "PSY - Gangnam Style.mp3",
            "candidate": null,
            "strategy_used": "combined search",
            "confidence": 0,
            "selected": false,
            "search_status": "not_found"
        });
        assert!(serde_json::from_value::<AnnotatedTrack>(json).is_err());
    }

    #[test]
    fn test_report_save_load_reselect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let strong = AnnotatedTrack {
            guess: sample_guess(),
            result: SearchResult::found(sample_track(), SearchStrategy::ArtistTrack),
            confidence: 95,
            selected: true,
            search_status: SearchStatus::Found,
        };
        let weak = AnnotatedTrack {
            confidence: 40,
            ..strong.clone()
        };
        let report = MatchReport {
            source: "party.ycd".to_string(),
            cancelled: false,
            tracks: vec![strong, weak, AnnotatedTrack::pending(sample_guess())],
            stats: BatchStats::new(3),
        };
        report.save(&path).unwrap();

        let mut loaded = MatchReport::load(&path).unwrap();
        assert_eq!(loaded.tracks, report.tracks);

        loaded.reselect(60);
        let selected: Vec<bool> = loaded.tracks.iter().map(|t| t.selected).collect();
        assert_eq!(selected, vec![true, false, false]);
        assert_eq!(loaded.stats.selected, 1);
    }
}
