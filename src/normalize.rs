//! Shared string normalization for path parsing and match scoring.
//!
//! Two families live here:
//! - comparison normalization (`normalize_for_comparison`), used on both sides
//!   of every similarity check
//! - path cleanup (`cleanup_string`), used on artist/title guesses pulled out of
//!   file names before they are sent to the catalog
//!
//! CRITICAL: the parser and the confidence scorer both depend on these. Run the
//! tests in `parser` and `scoring` after changing anything here.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Leading article: "The Killers" → "Killers", "A Perfect Circle" → "Perfect Circle"
pub static LEADING_ARTICLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:the|a)\s+").unwrap());

/// Leading track number with optional separator: "03 - Song", "7.Song", "12 Song"
pub static TRACK_NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\s*[-.]?\s*").unwrap());

/// Release-type annotations in parentheses: "(Single)", "(Radio Version)", "(EP)",
/// "(Deluxe Album)", "(Radio Edit)". Any casing, keyword anywhere inside the parens.
pub static RELEASE_PARENTHETICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\([^)]*(?:single|ep|album|version|edit)[^)]*\)\s*").unwrap()
});

/// Trailing track number left over from "Title - 03"
pub static TRAILING_TRACK_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*\d+\s*$").unwrap());

/// Dangling extension-like suffix: "Song.mp3" after the real extension was removed
pub static DANGLING_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\.[0-9A-Za-z_]+$").unwrap());

/// Everything that is neither a word character nor whitespace
pub static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Any whitespace run
pub static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Collapse whitespace runs to a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, " ").trim().to_string()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize a string for similarity comparison.
/// Lower-cases, drops punctuation, collapses whitespace.
///
/// Accents are kept: "Ça va" and "Ca va" are different words. Input is only
/// recomposed to NFC so a decomposed "é" (common in macOS file names) equals
/// the precomposed one the catalog returns.
///
/// Word characters are Unicode-aware, so Hebrew or Cyrillic names survive
/// instead of normalizing to an empty string.
pub fn normalize_for_comparison(s: &str) -> String {
    let composed: String = s.nfc().collect();
    let lowered = composed.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    collapse_whitespace(&stripped)
}

/// Remove punctuation but keep casing and inner spacing.
/// Used to build the "cleaned search terms" query.
pub fn strip_punctuation(s: &str) -> String {
    NON_WORD.replace_all(s, "").trim().to_string()
}

fn cleanup_pass(s: &str) -> String {
    let mut result = LEADING_ARTICLE.replace(s, "").to_string();
    result = TRACK_NUMBER_PREFIX.replace(&result, "").to_string();
    result = RELEASE_PARENTHETICAL.replace_all(&result, " ").to_string();
    result = TRAILING_TRACK_NUMBER.replace(&result, "").to_string();
    result = DANGLING_EXTENSION.replace(&result, "").to_string();
    collapse_whitespace(&result)
}

/// Clean an artist or title guess taken from a file name.
///
/// Strips a leading "The "/"A ", a leading track number, release-type
/// parentheticals (Single/EP/Album/Version/Edit), a trailing "- 03", a dangling
/// extension, then collapses whitespace. Passes repeat until the string stops
/// changing, so the result is stable under another cleanup.
pub fn cleanup_string(s: &str) -> String {
    // After the first collapse every change shortens the string
    let mut current = collapse_whitespace(s);
    loop {
        let next = cleanup_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

// ============================================================================
// TESTS
// ============================================================================
