//! Create a Spotify playlist from the selected tracks of a match report.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use ycd_reconcile::config::{init_tracing, load_dotenv, SpotifyArgs};
use ycd_reconcile::models::MatchReport;
use ycd_reconcile::playlist::{create_playlist, selected_uris, validate_playlist_name};
use ycd_reconcile::progress::{create_spinner, format_duration, set_log_only};
use ycd_reconcile::spotify::SpotifyClient;

#[derive(Parser)]
#[command(name = "ycd-playlist")]
#[command(about = "Create a Spotify playlist from a ycd-match report")]
struct Args {
    /// Report written by ycd-match (edit `selected` first if needed)
    report: PathBuf,

    /// Playlist name
    #[arg(long)]
    name: String,

    /// Create a private playlist
    #[arg(long)]
    private: bool,

    /// Re-select found tracks by confidence, ignoring `selected` in the report
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    min_confidence: Option<u8>,

    /// Validate and show what would be added, without creating anything
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    spotify: SpotifyArgs,

    #[arg(long)]
    log_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing();
    set_log_only(args.log_only);

    let start = Instant::now();

    let mut report = MatchReport::load(&args.report)
        .with_context(|| format!("Failed to load report {:?}", args.report))?;
    if let Some(min) = args.min_confidence {
        report.reselect(min);
    }
    if report.cancelled {
        println!("Note: report comes from a cancelled run, some tracks were never searched");
    }

    let name = validate_playlist_name(&args.name)?;
    let uris = selected_uris(&report.tracks)?;
    println!("{} of {} tracks selected", uris.len(), report.tracks.len());

    if args.dry_run {
        for track in report.tracks.iter().filter(|t| t.selected_uri().is_some()) {
            println!(
                "  {:>3}%  {} - {}",
                track.confidence, track.guess.artist, track.guess.title
            );
        }
        return Ok(());
    }

    let session = args.spotify.session()?;
    if session.is_expired() {
        bail!("Access token has expired, run `spotify-auth refresh` first");
    }
    let catalog = SpotifyClient::new(&args.spotify.api_base)?;

    let spinner = create_spinner(&format!("Creating playlist \"{}\"", name));
    let outcome = create_playlist(&catalog, &session, &name, &report.tracks, !args.private).await;
    spinner.finish_and_clear();
    let summary = outcome.context("Failed to create playlist")?;

    println!("\n{:=<60}", "");
    println!("Playlist created!");
    println!("  Name:    {}", summary.name);
    println!("  Tracks:  {}/{}", summary.tracks_added, summary.total_selected);
    println!("  URL:     {}", summary.url);
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");
    Ok(())
}
