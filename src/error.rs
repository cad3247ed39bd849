//! Crate-level error taxonomy.
//!
//! Per-line parse failures and per-step search failures are recovered where
//! they happen and never reach this type. What does reach it is something the
//! caller has to act on.

use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("No valid tracks found in file")]
    NoTracksFound,

    #[error("Not authenticated with the catalog: an access token is required")]
    AuthRequired,

    #[error("Catalog search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Upload rejected: {}", .0.join("; "))]
    InvalidUpload(Vec<String>),

    #[error("Invalid playlist request: {}", .0.join("; "))]
    InvalidPlaylist(Vec<String>),

    #[error("Configuration invalid: {}", .0.join("; "))]
    Config(Vec<String>),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
