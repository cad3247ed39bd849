//! Progress bar and logging utilities.
//!
//! Batch searches take ~100ms per track at minimum, so long playlists get a
//! progress bar. In log-only mode bars are hidden and periodic
//! `[phase] n/total (pct%)` lines go to stderr instead.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::models::{AnnotatedTrack, SearchStatus};

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Log-only progress line every this many tracks
pub const LOG_INTERVAL: u64 = 25;

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

/// Create a progress bar with consistent styling.
/// In log-only mode, the progress bar is hidden.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) = ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (ETA: {eta}) {wide_msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_prefix(msg.to_string());
    pb
}

/// Log progress periodically for tail-friendly output.
/// Only logs when in log-only mode and at specified intervals.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && total > 0 && (current % interval == 0 || current == total) {
        let pct = 100.0 * current as f64 / total as f64;
        eprintln!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

/// Create a spinner for indeterminate progress.
/// In log-only mode, the spinner is hidden.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// One-line description of a searched track for the bar message
pub fn describe_track(track: &AnnotatedTrack) -> String {
    let marker = match track.search_status {
        SearchStatus::Found => "✓",
        SearchStatus::NotFound => "✗",
        SearchStatus::Pending => "…",
    };
    format!(
        "{} {} - {} ({}%)",
        marker, track.guess.artist, track.guess.title, track.confidence
    )
}

/// Progress display for a batch search
pub struct SearchProgress {
    bar: ProgressBar,
    phase: &'static str,
}

impl SearchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            bar: create_progress_bar(total as u64, "Searching"),
            phase: "search",
        }
    }

    /// Callback for [`crate::pipeline::search_batch`]
    pub fn update(&self, done: usize, total: usize, track: &AnnotatedTrack) {
        self.bar.set_position(done as u64);
        self.bar.set_message(describe_track(track));
        log_progress(self.phase, done as u64, total as u64, LOG_INTERVAL);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackGuess;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_describe_track() {
        let track = AnnotatedTrack::pending(TrackGuess {
            artist: "Adele".to_string(),
            title: "Hello".to_string(),
            original_path: "Adele - Hello.mp3".to_string(),
        });
        assert_eq!(describe_track(&track), "… Adele - Hello (0%)");
    }
}
