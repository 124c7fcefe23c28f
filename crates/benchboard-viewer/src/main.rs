//! benchboard - browse published benchmark leaderboards from a terminal.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use benchboard_protocol::DisplayMode;
use benchboard_state::{ErrorBars, Theme};
use benchboard_viewer::config::Environment;
use benchboard_viewer::{console, print, LeaderboardController, ManifestResolver, SourceFetcher, ViewerConfig};

#[derive(Parser)]
#[command(name = "benchboard")]
#[command(version)]
#[command(about = "Browse benchmark leaderboards, per-run details and recorded requests", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (defaults to <config dir>/benchboard/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data environment: development reads local files, production the published site
    #[arg(short, long, global = true)]
    env: Option<Environment>,

    /// Which benchmark to show: model or community
    #[arg(short, long, global = true)]
    mode: Option<DisplayMode>,

    /// Dataset version; the manifest default when omitted
    #[arg(long = "data-version", global = true)]
    data_version: Option<String>,

    /// Chart palette: light or dark
    #[arg(long, global = true)]
    theme: Option<Theme>,

    /// Error bars on the summary chart: std-dev or confidence95
    #[arg(long, global = true)]
    error_bars: Option<ErrorBars>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal leaderboard (default)
    Console,

    /// Print the leaderboard as plain text
    Print {
        /// Ranks whose per-run details should be printed
        #[arg(short, long, value_delimiter = ',')]
        expand: Vec<usize>,
    },
}

fn init_tracing(verbose: u8, log_file: Option<&Path>, interactive: bool) -> anyhow::Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // The console owns the terminal; without a log file, logs are dropped.
        None if interactive => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn apply_cli(config: &mut ViewerConfig, cli: &Cli) {
    if let Some(env) = cli.env {
        config.environment = env;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(version) = &cli.data_version {
        config.version = Some(version.clone());
    }
    if let Some(bars) = cli.error_bars {
        config.error_bars = bars;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ViewerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    apply_cli(&mut config, &cli);

    let interactive = !matches!(cli.command, Some(Commands::Print { .. }));
    init_tracing(cli.verbose, config.log_file.as_deref(), interactive)?;

    tracing::info!(
        environment = %config.environment,
        mode = %config.mode,
        data_root = %config.data_root(),
        "Starting benchboard"
    );

    let fetcher = SourceFetcher::new(config.local_root.clone(), config.request_timeout())
        .context("failed to build HTTP client")?;
    let resolver = ManifestResolver::new(config.data_root(), config.mode, config.community_model());
    let mut controller =
        LeaderboardController::new(Arc::new(fetcher), resolver, config.theme, config.error_bars);

    match cli.command.unwrap_or(Commands::Console) {
        Commands::Console => {
            // A manifest failure is shown on the page rather than aborting.
            if let Err(e) = controller.start(config.version.as_deref()).await {
                tracing::warn!(error = %e, "Starting without a dataset");
            }
            console::run_console(controller).await
        }
        Commands::Print { expand } => {
            controller
                .start(config.version.as_deref())
                .await
                .context("failed to load leaderboard")?;
            let text = print::print_board(&mut controller, &expand).await;
            println!("{text}");
            Ok(())
        }
    }
}
