use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mirrorlink_core::{bootstrap, logging};
use mirrorlink_providers::netmirror::MediaQuery;
use mirrorlink_providers::{ErrorKind, NetMirrorError};

#[derive(Parser, Debug)]
#[command(name = "mirrorlink")]
#[command(about = "Resolve playable HLS streams from mirror sites", long_about = None)]
struct Args {
    /// Config file (YAML, TOML or JSON)
    #[arg(long, short, global = true, env = "MIRRORLINK_CONFIG_PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a movie, or a show episode when --season/--episode are given
    Resolve {
        /// Title to search for
        title: String,

        /// Release year
        #[arg(long)]
        year: i32,

        /// Season number (shows only)
        #[arg(long, requires = "episode")]
        season: Option<u32>,

        /// Episode number (shows only)
        #[arg(long, requires = "season")]
        episode: Option<u32>,

        /// Mirror profile (defaults to `default_profile`)
        #[arg(long, short)]
        profile: Option<String>,
    },
    /// List configured mirror profiles, highest rank first
    Profiles,
}

fn exit_code(kind: ErrorKind) -> ExitCode {
    match kind {
        ErrorKind::NotFound => ExitCode::from(2),
        ErrorKind::Cancelled => ExitCode::from(130),
        _ => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = bootstrap::load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;

    match args.command {
        Command::Profiles => {
            for profile in config.profiles_by_rank() {
                let marker = if profile.name == config.default_profile { "*" } else { " " };
                println!(
                    "{marker} {:<16} rank={:<5} {} ({})",
                    profile.name, profile.rank, profile.base_url, profile.display_name
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Resolve { title, year, season, episode, profile } => {
            let query = match (season, episode) {
                (Some(season), Some(episode)) => MediaQuery::show(title, year, season, episode),
                _ => MediaQuery::movie(title, year),
            };

            let resolver = bootstrap::resolver_for(&config, profile.as_deref())?;

            // Ctrl-C cancels the in-flight resolution
            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling resolution");
                    ctrl_c.cancel();
                }
            });

            let progress = |percent: u8| info!(percent, "Progress");
            match resolver.resolve(&query, &cancel, &progress).await {
                Ok(stream) => {
                    println!("{}", serde_json::to_string_pretty(&stream)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    report(&e);
                    Ok(exit_code(e.kind()))
                }
            }
        }
    }
}

fn report(err: &NetMirrorError) {
    error!(kind = err.kind().as_str(), "Resolution failed: {err}");
    eprintln!("{}: {err}", err.kind().as_str());
}
