//! Safety checks so a match report never lands on top of its input.
//!
//! A mistyped `-o` pointing at the playlist export would destroy the only copy
//! of the user's paths.

use anyhow::{bail, Result};
use std::path::Path;

use crate::parser::ALLOWED_EXTENSIONS;

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output must have the required extension (e.g. "json")
/// - Output must not be one of the source paths, compared after resolving
///   symlinks and `..` when the files exist
/// - Output must not look like a playlist export
pub fn validate_output_path(output: &Path, required_ext: &str, source_paths: &[&Path]) -> Result<()> {
    let output_ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if output_ext != required_ext {
        bail!(
            "Safety check failed: output file '{}' must have a .{} extension",
            output.display(),
            required_ext
        );
    }

    let resolved_output = output.canonicalize().ok();
    for source in source_paths {
        let same = output == *source
            || resolved_output
                .as_ref()
                .is_some_and(|out| source.canonicalize().is_ok_and(|src| &src == out));
        if same {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    if ALLOWED_EXTENSIONS.contains(&output_ext.as_str()) {
        bail!(
            "Safety check failed: output '{}' looks like a playlist export",
            output.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_output() {
        let output = PathBuf::from("/tmp/party-matches.json");
        let source = PathBuf::from("/data/party.ycd");
        assert!(validate_output_path(&output, "json", &[&source]).is_ok());
    }

    #[test]
    fn test_extension_case_insensitive() {
        let output = PathBuf::from("/tmp/REPORT.JSON");
        assert!(validate_output_path(&output, "json", &[]).is_ok());
    }

    #[test]
    fn test_missing_extension() {
        let output = PathBuf::from("/tmp/party.ycd");
        let source = PathBuf::from("/data/other.ycd");
        let result = validate_output_path(&output, "json", &[&source]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must have a .json extension"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/list.json");
        let result = validate_output_path(&path, "json", &[&path]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }

    #[test]
    fn test_output_equals_source_via_dotdot() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let source = dir.path().join("list.json");
        std::fs::write(&source, "{}").unwrap();

        let sneaky = sub.join("..").join("list.json");
        assert!(validate_output_path(&sneaky, "json", &[&source]).is_err());
    }

    #[test]
    fn test_playlist_extension_blocked() {
        let output = PathBuf::from("/tmp/party.m3u");
        assert!(validate_output_path(&output, "m3u", &[]).is_err());
    }
}
