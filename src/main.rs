//! # Tourney Dash - Terminal Dashboard for a Tournament Model Pipeline
//!
//! Downloads tournament datasets, trains a model, generates predictions and
//! uploads them, showing live progress, system load and an event feed.

mod app;
mod config;
pub mod constants;
mod errors;
mod input;
mod models;
mod monitor;
mod pipeline;
mod state;
mod ui;
mod utils;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::{Collaborators, DashboardController};
use config::{Backend, Config};
use constants::*;
use input::CrosstermDriver;
use monitor::SystemCollector;
use pipeline::command::CommandBackend;
use pipeline::simulated::{SimulatedPipeline, SimulatedTournament};
use pipeline::{ModelPipeline, TournamentApi};

/// Tourney Dash - terminal dashboard for a tournament model pipeline
#[derive(Parser, Debug)]
#[command(
    name = "tourney-dash",
    version,
    about = "Download, train, predict and submit from one terminal dashboard"
)]
struct Cli {
    /// Config file (default: ~/.config/tourney-dash/config.toml)
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// Use the built-in simulated backend regardless of config
    #[arg(long)]
    demo: bool,

    /// Start downloading as soon as the dashboard opens
    #[arg(long)]
    auto_start: bool,

    /// Do not start training after the datasets are downloaded
    #[arg(long)]
    no_auto_train: bool,

    /// Predict and upload after auto-started training
    #[arg(long)]
    auto_submit: bool,

    /// Directory datasets and predictions are written to
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Directory the model is written to
    #[arg(long, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Color theme (default, gruvbox, nord)
    #[arg(long, short = 't')]
    theme: Option<String>,

    /// Log file (default: ~/.local/share/tourney-dash/tourney-dash.log)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if self.demo {
            config.backend = Backend::Simulated;
        }
        if self.auto_start {
            config.auto_start_pipeline = true;
        }
        if self.no_auto_train {
            config.auto_train_after_download = false;
        }
        if self.auto_submit {
            config.auto_submit = true;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(theme) = &self.theme {
            config.theme = theme.clone();
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config_file_path);
    let (mut config, config_error) = match Config::load_from(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    cli.apply(&mut config);

    // The dashboard owns stdout, so logs go to a file.
    init_logging(&config.log_path(), &config.log_level)?;
    for warning in &config.warnings {
        tracing::warn!(path = %config_path.display(), "{}", warning);
    }
    if let Some(e) = config_error {
        tracing::warn!(
            path = %config_path.display(),
            error = %e,
            "failed to parse config, using defaults"
        );
    }
    tracing::info!(
        backend = ?config.backend,
        data_dir = %config.data_dir.display(),
        "starting tourney-dash"
    );

    let (api, pipeline) = build_backend(&config);
    let mut dashboard = DashboardController::new(
        &config,
        Collaborators {
            api,
            pipeline,
            snapshots: Box::new(SystemCollector::new()),
            terminal: Box::new(CrosstermDriver),
        },
    );

    let result = dashboard.run().await;

    // Terminal is restored by now; echo the tail of the feed.
    for event in dashboard.events().recent(SHUTDOWN_EVENT_ECHO) {
        println!("{} {} {}", event.time_label(), event.level.icon(), event.message);
    }

    result.context("terminal unavailable")
}

fn init_logging(path: &Path, level: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_backend(config: &Config) -> (Arc<dyn TournamentApi>, Arc<dyn ModelPipeline>) {
    match config.backend {
        Backend::Simulated => {
            let step = Duration::from_millis(SIMULATED_STEP_MS);
            (
                Arc::new(SimulatedTournament::new(step, SIMULATED_TRANSFER_STEPS)),
                Arc::new(SimulatedPipeline::new(step, SIMULATED_EPOCHS, SIMULATED_ROWS)),
            )
        }
        Backend::Command => {
            let backend = Arc::new(CommandBackend::from_config(config));
            (backend.clone(), backend)
        }
    }
}
