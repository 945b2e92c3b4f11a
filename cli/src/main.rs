//! staffdir CLI - binary entry point.
//!
//! # Architecture
//!
//! The CLI wires the reqwest-backed collaborators from [`staffdir_providers`]
//! into the view-models of [`staffdir_engine`], then renders the snapshots
//! those view-models publish.
//!
//! ```text
//! main() -> StaffdirConfig -> HttpClient -> {Login,Directory}ViewModel
//!                                                 |
//!                                                 v
//!                                   Subscription -> render -> stdout
//! ```
//!
//! Logs never go to stdout: stdout is the rendering surface.

mod commands;
mod render;

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use staffdir_config::StaffdirConfig;

#[derive(Debug, Parser)]
#[command(name = "staffdir", version, about = "Browse the staff directory")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Read configuration from PATH instead of ~/.staffdir/config.toml.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// More log detail (-v debug, -vv trace). Overrides RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors. Overrides RUST_LOG.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Exchange credentials for a session token.
    Login {
        #[arg(value_name = "EMAIL")]
        email: String,
        #[arg(value_name = "PASSWORD")]
        password: String,
    },
    /// List the directory and load every avatar.
    Directory {
        /// Stop waiting for avatars after this many seconds.
        #[arg(long, value_name = "N", default_value_t = commands::DEFAULT_WAIT_SECS)]
        wait_secs: u64,
    },
}

impl Cli {
    fn log_filter(&self) -> Option<&'static str> {
        if self.quiet {
            return Some("error");
        }
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

fn init_tracing(config_path: Option<&Path>, level: Option<&str>) {
    let env_filter = match level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info")),
    }
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file(config_path);

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: prefer no logs over interleaving them with rendered output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file(config_path: Option<&Path>) -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates(config_path) {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates(config_path: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: logs/ next to the config file, ~/.staffdir/logs by default.
    let config_path = config_path
        .map(Path::to_path_buf)
        .or_else(StaffdirConfig::path);
    if let Some(config_dir) = config_path.as_deref().and_then(Path::parent) {
        candidates.push(config_dir.join("logs").join("staffdir.log"));
    }

    // Fallback: ./.staffdir/logs/staffdir.log
    candidates.push(PathBuf::from(".staffdir").join("logs").join("staffdir.log"));

    candidates
}

fn load_config(path: Option<&Path>) -> Result<StaffdirConfig> {
    let loaded = match path {
        Some(path) => StaffdirConfig::load_from(path),
        None => StaffdirConfig::load(),
    }
    .context("loading configuration")?;

    if loaded.is_none() {
        tracing::debug!("No config file, using defaults");
    }
    Ok(loaded.unwrap_or_default())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.config.as_deref(), cli.log_filter());

    let config = load_config(cli.config.as_deref())?;
    let settings = config
        .http_settings()
        .context("resolving API settings")?;
    tracing::info!(?settings, "Resolved API settings");

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Login { email, password } => {
            commands::login(settings, email, password, &mut stdout).await
        }
        Command::Directory { wait_secs } => {
            commands::directory(
                settings,
                config.max_concurrent_assets(),
                std::time::Duration::from_secs(wait_secs),
                &mut stdout,
            )
            .await
        }
    }
}
