//! Obtain Spotify tokens for the other tools.
//!
//! `url` prints the consent page, `exchange` trades the redirect's `code` for a
//! session, `refresh` renews it. Sessions are printed as JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ycd_reconcile::auth::{authorize_url, AuthClient, Session};
use ycd_reconcile::config::{init_tracing, load_dotenv, SpotifyArgs};

#[derive(Parser)]
#[command(name = "spotify-auth")]
#[command(about = "Authorize against Spotify and print session tokens")]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    spotify: SpotifyArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Print the URL to open in a browser
    Url {
        /// Opaque value echoed back on the redirect
        #[arg(long)]
        state: Option<String>,
    },
    /// Exchange an authorization code for a user session
    Exchange {
        #[arg(long)]
        code: String,
    },
    /// Renew an access token
    Refresh {
        #[arg(long, env = "SPOTIFY_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },
    /// App-only session (search works, playlists don't)
    ClientCredentials,
}

fn print_session(session: &Session) -> Result<()> {
    let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing();

    match args.command {
        Command::Url { state } => {
            let config = args.spotify.oauth_config(true)?;
            let url = authorize_url(&config, state.as_deref())?;
            println!("{}", url);
        }
        Command::Exchange { code } => {
            let client = AuthClient::new(args.spotify.oauth_config(true)?)?;
            let session = client
                .exchange_code(&code)
                .await
                .context("Failed to exchange code for tokens")?;
            print_session(&session)?;
        }
        Command::Refresh { refresh_token } => {
            let client = AuthClient::new(args.spotify.oauth_config(false)?)?;
            let current = Session::from_refresh_token(refresh_token);
            let session = client
                .refresh(&current)
                .await
                .context("Failed to refresh token")?;
            print_session(&session)?;
        }
        Command::ClientCredentials => {
            let client = AuthClient::new(args.spotify.oauth_config(false)?)?;
            let session = client
                .client_credentials()
                .await
                .context("Failed to obtain client credentials token")?;
            print_session(&session)?;
        }
    }
    Ok(())
}
