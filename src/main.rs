use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use ycd_reconcile::auth::{AuthClient, Session};
use ycd_reconcile::config::{init_tracing, load_dotenv, SpotifyArgs};
use ycd_reconcile::models::{AnnotatedTrack, BatchStats, MatchReport};
use ycd_reconcile::parser::read_ycd_file;
use ycd_reconcile::pipeline::{search_batch, BatchOptions};
use ycd_reconcile::progress::{format_duration, set_log_only, SearchProgress};
use ycd_reconcile::safety::validate_output_path;
use ycd_reconcile::scoring::ConfidenceLevel;
use ycd_reconcile::spotify::SpotifyClient;

#[derive(Parser)]
#[command(name = "ycd-match")]
#[command(about = "Match a YCD playlist export against the Spotify catalog")]
struct Args {
    /// YCD/M3U/TXT playlist export
    source: PathBuf,

    /// JSON match report to write
    output: PathBuf,

    #[command(flatten)]
    spotify: SpotifyArgs,

    /// Pause between consecutive searches
    #[arg(long, default_value = "100")]
    delay_ms: u64,

    /// Only pre-select found tracks at or above this confidence
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=100))]
    min_confidence: u8,

    /// Use an app-only token instead of SPOTIFY_ACCESS_TOKEN
    #[arg(long)]
    client_credentials: bool,

    /// Parse only, write a report of pending tracks
    #[arg(long)]
    dry_run: bool,

    /// Hide progress bars, print periodic progress lines instead
    #[arg(long)]
    log_only: bool,

    /// Dump batch statistics as JSON to stderr
    #[arg(long)]
    stats: bool,
}

async fn resolve_session(args: &Args) -> Result<Session> {
    if args.client_credentials {
        let config = args.spotify.oauth_config(false)?;
        let client = AuthClient::new(config)?;
        return client
            .client_credentials()
            .await
            .context("Failed to obtain client credentials token");
    }
    Ok(args.spotify.session()?)
}

fn print_summary(report: &MatchReport, output: &Path, elapsed: Duration) {
    let stats = &report.stats;
    println!("\n{:=<60}", "");
    if report.cancelled {
        println!("Matching cancelled, partial report written");
    } else {
        println!("Matching complete!");
    }
    println!("  Tracks:     {}/{} searched", stats.searched, stats.total_tracks);
    println!("  Found:      {} ({:.1}%)", stats.found, stats.match_rate());
    println!("  Not found:  {}", stats.not_found);
    if stats.unavailable > 0 {
        println!("  Unavailable: {}", stats.unavailable);
    }
    println!(
        "  Avg confidence: {}% ({})",
        stats.average_confidence(),
        ConfidenceLevel::from_score(stats.average_confidence()).label()
    );
    for (strategy, count) in &stats.by_strategy {
        println!("    {:<40} {}", strategy, count);
    }
    println!("  Selected:   {}", stats.selected);
    println!("  Report:     {:?}", output);
    println!("  Elapsed:    {}", format_duration(elapsed));
    println!("{:=<60}", "");
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing();
    set_log_only(args.log_only);

    validate_output_path(&args.output, "json", &[args.source.as_path()])?;

    let start = Instant::now();

    println!("Reading playlist: {:?}", args.source);
    let guesses = read_ycd_file(&args.source)
        .with_context(|| format!("Failed to read playlist {:?}", args.source))?;
    println!("Parsed {} tracks", guesses.len());

    let source = args.source.display().to_string();

    if args.dry_run {
        let total = guesses.len();
        let report = MatchReport {
            source,
            cancelled: false,
            tracks: guesses.into_iter().map(AnnotatedTrack::pending).collect(),
            stats: BatchStats::new(total),
        };
        report.save(&args.output).context("Failed to write report")?;
        println!("Dry run: wrote {} pending tracks to {:?}", total, args.output);
        return Ok(());
    }

    let session = resolve_session(&args).await?;
    let catalog = SpotifyClient::new(&args.spotify.api_base)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing current track");
            ctrl_c.cancel();
        }
    });

    let options = BatchOptions {
        delay: Duration::from_millis(args.delay_ms),
        auto_select_threshold: args.min_confidence,
    };

    let progress = SearchProgress::new(guesses.len());
    let outcome = search_batch(
        &catalog,
        &session,
        guesses,
        &options,
        &cancel,
        |done, total, track| progress.update(done, total, track),
    )
    .await;
    progress.finish();
    let outcome = outcome.context("Batch search failed")?;

    if args.stats {
        outcome.stats.log_phase("search");
    }

    let report = MatchReport {
        source,
        cancelled: outcome.cancelled,
        tracks: outcome.tracks,
        stats: outcome.stats,
    };
    report.save(&args.output).context("Failed to write report")?;

    print_summary(&report, &args.output, start.elapsed());
    Ok(())
}
