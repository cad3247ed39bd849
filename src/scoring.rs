//! Scoring functions for catalog matching.
//!
//! This module contains:
//! - String similarity between a path-derived guess and catalog text
//! - Strategy bonus lookup
//! - Combined confidence scoring (0-100)
//! - Confidence level classification

use crate::models::{CatalogTrack, SearchStrategy, TrackGuess};
use crate::normalize::normalize_for_comparison;

// ============================================================================
// Weights
// ============================================================================

pub const ARTIST_WEIGHT: f64 = 0.40;
pub const TITLE_WEIGHT: f64 = 0.50;

/// Similarity returned when one string contains the other
pub const SUBSTRING_SIMILARITY: f64 = 0.9;

/// Words must be longer than this to match on a shared prefix
const PREFIX_MATCH_MIN_LEN: usize = 3;

// ============================================================================
// Confidence Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl ConfidenceLevel {
    pub fn from_score(confidence: u8) -> Self {
        match confidence {
            90..=u8::MAX => ConfidenceLevel::Excellent,
            75..=89 => ConfidenceLevel::VeryGood,
            60..=74 => ConfidenceLevel::Good,
            40..=59 => ConfidenceLevel::Fair,
            _ => ConfidenceLevel::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::Excellent => "Excellent",
            ConfidenceLevel::VeryGood => "Very Good",
            ConfidenceLevel::Good => "Good",
            ConfidenceLevel::Fair => "Fair",
            ConfidenceLevel::Poor => "Poor",
        }
    }
}

// ============================================================================
// String Similarity
// ============================================================================

/// Lenient word match: equal, substring either way, or a shared
/// three-character prefix when both words are long enough.
fn words_match(a: &str, b: &str) -> bool {
    if a == b || a.contains(b) || b.contains(a) {
        return true;
    }

    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len > PREFIX_MATCH_MIN_LEN && b_len > PREFIX_MATCH_MIN_LEN {
        let a_prefix: String = a.chars().take(PREFIX_MATCH_MIN_LEN).collect();
        let b_prefix: String = b.chars().take(PREFIX_MATCH_MIN_LEN).collect();
        return a.starts_with(&b_prefix) || b.starts_with(&a_prefix);
    }

    false
}

/// Similarity between two normalized strings (0.0 to 1.0).
///
/// Not a metric: substring containment short-circuits to 0.9, otherwise the
/// share of words in `a` that loosely match some word in `b`, divided by the
/// longer word count. Tolerates transliteration and abbreviation noise at the
/// cost of some false positives.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    if a.contains(b) || b.contains(a) {
        return SUBSTRING_SIMILARITY;
    }

    let words_a: Vec<&str> = a.split_whitespace().collect();
    let words_b: Vec<&str> = b.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let matching = words_a
        .iter()
        .filter(|wa| words_b.iter().any(|wb| words_match(wa, wb)))
        .count();

    matching as f64 / words_a.len().max(words_b.len()) as f64
}

// ============================================================================
// Confidence Scoring
// ============================================================================

/// Fixed bonus for how the candidate was found. Unknown strategy gets nothing.
pub fn strategy_bonus(strategy: Option<SearchStrategy>) -> f64 {
    match strategy {
        Some(SearchStrategy::ArtistTrack) => 0.10,
        Some(SearchStrategy::Combined) => 0.08,
        Some(SearchStrategy::TitleArtistMatch) => 0.06,
        Some(SearchStrategy::CleanedTerms) => 0.05,
        Some(SearchStrategy::TitleOnly) => 0.02,
        None => 0.0,
    }
}

/// Combine similarities and strategy into a 0-100 confidence.
pub fn score_components(
    artist_similarity: f64,
    title_similarity: f64,
    strategy: Option<SearchStrategy>,
) -> u8 {
    let raw = artist_similarity * ARTIST_WEIGHT
        + title_similarity * TITLE_WEIGHT
        + strategy_bonus(strategy);
    let capped = raw.clamp(0.0, 1.0);
    (capped * 100.0).round() as u8
}

/// Confidence (0-100) that `candidate` is the track `guess` describes.
/// Returns 0 when there is no candidate.
pub fn confidence_score(
    guess: &TrackGuess,
    candidate: Option<&CatalogTrack>,
    strategy: Option<SearchStrategy>,
) -> u8 {
    let Some(candidate) = candidate else {
        return 0;
    };

    let guess_artist = normalize_for_comparison(&guess.artist);
    let guess_title = normalize_for_comparison(&guess.title);
    let candidate_artist = normalize_for_comparison(&candidate.joined_artists());
    let candidate_title = normalize_for_comparison(&candidate.name);

    let artist_similarity = similarity(&guess_artist, &candidate_artist);
    let title_similarity = similarity(&guess_title, &candidate_title);

    score_components(artist_similarity, title_similarity, strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, artists: &[&str]) -> CatalogTrack {
        CatalogTrack {
            id: "id".to_string(),
            name: name.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            album: "Album".to_string(),
            uri: "spotify:track:id".to_string(),
            external_url: "https://open.spotify.com/track/id".to_string(),
            duration_ms: 200_000,
        }
    }

    fn guess(artist: &str, title: &str) -> TrackGuess {
        TrackGuess {
            artist: artist.to_string(),
            title: title.to_string(),
            original_path: format!("{} - {}", artist, title),
        }
    }

    #[test]
    fn test_similarity_identity_and_empty() {
        for x in ["a", "kiss you", "gangnam style", "עומר אדם"] {
            assert_eq!(similarity(x, x), 1.0);
            assert_eq!(similarity(x, ""), 0.0);
            assert_eq!(similarity("", x), 0.0);
        }
    }

    #[test]
    fn test_similarity_substring() {
        assert_eq!(similarity("kiss you", "kiss you radio edit"), 0.9);
        assert_eq!(similarity("one direction", "direction"), 0.9);
    }

    #[test]
    fn test_similarity_word_overlap() {
        // "taylor" matches, "swiftie" contains "swift"
        assert_eq!(similarity("taylor swiftie", "swift taylor"), 1.0);
        // one of two words matches
        assert_eq!(similarity("hello world", "hello there"), 0.5);
        // divided by the longer list
        assert_eq!(similarity("red", "red light green light"), 0.9); // substring first
        assert!((similarity("blue moon", "moon river dance") - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_prefix_needs_long_words() {
        assert_eq!(similarity("abcx", "abcy"), 1.0);
        // three-letter words are too short for prefix matching
        assert_eq!(similarity("abx", "aby"), 0.0);
    }

    #[test]
    fn test_similarity_unrelated() {
        assert_eq!(similarity("metallica", "adele"), 0.0);
    }

    #[test]
    fn test_strategy_bonus_table() {
        assert_eq!(strategy_bonus(Some(SearchStrategy::ArtistTrack)), 0.10);
        assert_eq!(strategy_bonus(Some(SearchStrategy::Combined)), 0.08);
        assert_eq!(strategy_bonus(Some(SearchStrategy::TitleArtistMatch)), 0.06);
        assert_eq!(strategy_bonus(Some(SearchStrategy::CleanedTerms)), 0.05);
        assert_eq!(strategy_bonus(Some(SearchStrategy::TitleOnly)), 0.02);
        assert_eq!(strategy_bonus(None), 0.0);
    }

    #[test]
    fn test_confidence_exact_match() {
        let score = confidence_score(
            &guess("PSY", "Gangnam Style"),
            Some(&track("Gangnam Style", &["PSY"])),
            Some(SearchStrategy::ArtistTrack),
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn test_confidence_absent_candidate() {
        assert_eq!(confidence_score(&guess("PSY", "Gangnam Style"), None, None), 0);
    }

    #[test]
    fn test_confidence_partial_match() {
        // artist substring (0.9 * 0.4 = 0.36) + title exact (0.5) + combined (0.08)
        let score = confidence_score(
            &guess("Guetta", "Titanium"),
            Some(&track("Titanium", &["David Guetta", "Sia"])),
            Some(SearchStrategy::Combined),
        );
        assert_eq!(score, 94);
    }

    #[test]
    fn test_confidence_wrong_track_is_low() {
        let score = confidence_score(
            &guess("Metallica", "One"),
            Some(&track("Hello", &["Adele"])),
            Some(SearchStrategy::TitleOnly),
        );
        assert_eq!(score, 2);
    }

    #[test]
    fn test_confidence_is_deterministic() {
        let g = guess("Imagine Dragons", "Radioactive");
        let t = track("Radioactive", &["Imagine Dragons", "Kendrick Lamar"]);
        let first = confidence_score(&g, Some(&t), Some(SearchStrategy::Combined));
        for _ in 0..10 {
            assert_eq!(confidence_score(&g, Some(&t), Some(SearchStrategy::Combined)), first);
        }
    }

    #[test]
    fn test_score_components_monotonic() {
        let steps: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
        for strategy in [None, Some(SearchStrategy::ArtistTrack), Some(SearchStrategy::TitleOnly)] {
            for &fixed in &steps {
                let mut prev_artist = 0u8;
                let mut prev_title = 0u8;
                for &x in &steps {
                    let by_artist = score_components(x, fixed, strategy);
                    let by_title = score_components(fixed, x, strategy);
                    assert!(by_artist >= prev_artist);
                    assert!(by_title >= prev_title);
                    prev_artist = by_artist;
                    prev_title = by_title;
                }
            }
        }
    }

    #[test]
    fn test_score_components_capped() {
        assert_eq!(score_components(1.0, 1.0, Some(SearchStrategy::ArtistTrack)), 100);
        assert_eq!(score_components(0.0, 0.0, None), 0);
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_score(100), ConfidenceLevel::Excellent);
        assert_eq!(ConfidenceLevel::from_score(90), ConfidenceLevel::Excellent);
        assert_eq!(ConfidenceLevel::from_score(89), ConfidenceLevel::VeryGood);
        assert_eq!(ConfidenceLevel::from_score(75), ConfidenceLevel::VeryGood);
        assert_eq!(ConfidenceLevel::from_score(60), ConfidenceLevel::Good);
        assert_eq!(ConfidenceLevel::from_score(40), ConfidenceLevel::Fair);
        assert_eq!(ConfidenceLevel::from_score(39), ConfidenceLevel::Poor);
        assert_eq!(ConfidenceLevel::Good.label(), "Good");
    }
}
