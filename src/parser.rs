//! YCD playlist ingestion.
//!
//! A YCD export is plain text with one filesystem path per line. Each path is
//! turned into an artist/title guess from the file name, or from the folder
//! layout when the file name has no "Artist - Title" shape.

use chardetng::EncodingDetector;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{ReconcileError, Result};
use crate::models::{TrackGuess, UNKNOWN_ARTIST};
use crate::normalize::cleanup_string;

/// Largest accepted upload (10 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Accepted playlist file extensions, lower-case
pub const ALLOWED_EXTENSIONS: &[&str] = &["ycd", "txt", "m3u", "m3u8"];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// "Artist - Album - 02 - Title"
static COMPLEX_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*-\s*(.+?)\s*-\s*\d+\s*-\s*(.+)$").unwrap());

/// "Artist - Title"
static SIMPLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*-\s*(.+)$").unwrap());

/// Final extension, from the last dot on
static FILE_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[^.]*$").unwrap());

/// Windows drive component: "C:"
static DRIVE_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]:$").unwrap());

/// Folder name that never names an artist
const LIBRARY_ROOT: &str = "Music";

// ============================================================================
// PATH PARSING
// ============================================================================

/// Why a single line produced no guess. Logged and skipped, never surfaced.
#[derive(Debug, Error, PartialEq, Eq)]
enum ParseFailure {
    #[error("path ends with a separator")]
    EmptyFileName,

    #[error("file name has nothing before its extension")]
    NoStem,
}

/// Which file-name shape produced the guess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameShape {
    Complex,
    Simple,
    Folders,
}

/// First ancestor folder that could be an artist, scanning from the
/// grandparent upward. The immediate parent is usually the album.
fn artist_from_folders(parts: &[&str]) -> Option<String> {
    let start = parts.len().checked_sub(3)?;
    parts[..=start]
        .iter()
        .rev()
        .find(|part| {
            !part.is_empty()
                && **part != LIBRARY_ROOT
                && !DRIVE_LETTER.is_match(part)
                && part.chars().count() > 1
        })
        .map(|part| part.to_string())
}

fn try_parse(path: &str) -> std::result::Result<(TrackGuess, NameShape), ParseFailure> {
    let parts: Vec<&str> = path.split(['/', '\\']).collect();
    let file_name = parts.last().copied().unwrap_or_default();
    if file_name.trim().is_empty() {
        return Err(ParseFailure::EmptyFileName);
    }

    let name = FILE_EXTENSION.replace(file_name, "");
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseFailure::NoStem);
    }

    let (artist, title, shape) = if let Some(caps) = COMPLEX_NAME.captures(name) {
        (caps[1].trim().to_string(), caps[3].trim().to_string(), NameShape::Complex)
    } else if let Some(caps) = SIMPLE_NAME.captures(name) {
        (caps[1].trim().to_string(), caps[2].trim().to_string(), NameShape::Simple)
    } else {
        let artist = artist_from_folders(&parts).unwrap_or_default();
        (artist, name.to_string(), NameShape::Folders)
    };

    let artist = cleanup_string(&artist);
    let title = cleanup_string(&title);

    let guess = TrackGuess {
        artist: if artist.is_empty() {
            UNKNOWN_ARTIST.to_string()
        } else {
            artist
        },
        title: if title.is_empty() {
            name.to_string()
        } else {
            title
        },
        original_path: path.to_string(),
    };
    Ok((guess, shape))
}

/// Guess artist and title from one playlist path.
///
/// Returns `None` when the path has no usable file name. Artist falls back to
/// "Unknown Artist" and title to the raw file name, so neither is ever empty.
pub fn parse_path(path: &str) -> Option<TrackGuess> {
    match try_parse(path) {
        Ok((guess, shape)) => {
            debug!(
                path = %path,
                ?shape,
                artist = %guess.artist,
                title = %guess.title,
                "Parsed path"
            );
            Some(guess)
        }
        Err(failure) => {
            warn!(path = %path, reason = %failure, "Skipping unparseable path");
            None
        }
    }
}

/// Parse a whole YCD document. Blank lines and `#` comments are ignored.
pub fn parse_ycd(text: &str) -> Result<Vec<TrackGuess>> {
    let guesses: Vec<TrackGuess> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_path)
        .collect();

    if guesses.is_empty() {
        return Err(ReconcileError::NoTracksFound);
    }
    debug!(count = guesses.len(), "Parsed YCD document");
    Ok(guesses)
}

// ============================================================================
// BYTES AND FILES
// ============================================================================

/// Decode raw upload bytes to text.
///
/// UTF-8 (with or without BOM) is taken as-is. Anything else is assumed to be
/// a legacy single-byte export, typically windows-1255 from Hebrew systems,
/// and is decoded with the detected encoding.
pub fn decode_ycd(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        warn!(encoding = encoding.name(), "Replaced undecodable bytes");
    } else {
        debug!(encoding = encoding.name(), "Decoded legacy encoding");
    }
    text.into_owned()
}

/// Check an upload's name and size. Every violation is reported.
pub fn validate_upload(file_name: &str, size: u64) -> Result<()> {
    let mut errors = Vec::new();

    if size > MAX_UPLOAD_BYTES {
        errors.push(format!(
            "File size exceeds maximum limit of {}MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        ));
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    let allowed = extension
        .as_deref()
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext));
    if !allowed {
        let list: Vec<String> = ALLOWED_EXTENSIONS.iter().map(|e| format!(".{}", e)).collect();
        errors.push(format!("Invalid file type. Allowed types: {}", list.join(", ")));
    }

    if file_name.contains("..") || file_name.contains('/') || file_name.contains('\\') {
        errors.push("Invalid filename containing path traversal characters".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::InvalidUpload(errors))
    }
}

/// Validate, read, decode and parse a playlist file from disk.
pub fn read_ycd_file(path: &Path) -> Result<Vec<TrackGuess>> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size = std::fs::metadata(path)?.len();
    validate_upload(&file_name, size)?;

    let bytes = std::fs::read(path)?;
    parse_ycd(&decode_ycd(&bytes))
}
