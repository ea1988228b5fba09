use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::constants::*;

/// Which collaborator implementation drives the operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Built-in fake download/train/predict/upload (demo mode).
    Simulated,
    /// User-supplied shell commands reporting JSON progress lines.
    Command,
}

impl Backend {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "simulated" | "demo" => Some(Backend::Simulated),
            "command" | "commands" => Some(Backend::Command),
            _ => None,
        }
    }
}

/// Shell command templates for the `command` backend.
///
/// Placeholders: `{dataset}`, `{dest}`, `{data_dir}`, `{model_dir}`,
/// `{predictions}`. Values are inserted single-quoted; do not quote them
/// again in the template.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommandTemplates {
    pub download: Option<String>,
    pub train: Option<String>,
    pub predict: Option<String>,
    pub upload: Option<String>,
}

/// Dashboard configuration with sensible defaults.
///
/// Can be overridden via ~/.config/tourney-dash/config.toml and CLI flags.
/// The controller and runner only read it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Launch the download job (with auto-chain) as soon as the dashboard runs.
    pub auto_start_pipeline: bool,
    /// Start training once every required dataset is downloaded.
    pub auto_train_after_download: bool,
    /// Predict and upload after an auto-started training.
    pub auto_submit: bool,
    pub data_dir: PathBuf,
    pub model_dir: PathBuf,
    /// Predictions file; `<data_dir>/predictions.csv` when unset.
    pub predictions_file: Option<PathBuf>,
    /// Datasets in download order.
    pub datasets: Vec<String>,
    /// Datasets that must be present before training auto-starts.
    pub required_datasets: Vec<String>,
    pub auto_chain_cooldown_ms: u64,
    pub event_log_capacity: usize,
    pub active_render_ms: u64,
    pub idle_render_ms: u64,
    pub snapshot_interval_ms: u64,
    pub tick_ms: u64,
    pub theme: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub backend: Backend,
    pub commands: CommandTemplates,
    /// Problems found while merging the file. Logging is not up yet when
    /// config loads, so the caller logs these afterwards.
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let datasets: Vec<String> = DEFAULT_DATASETS.iter().map(|s| s.to_string()).collect();
        Self {
            auto_start_pipeline: false,
            auto_train_after_download: true,
            auto_submit: false,
            data_dir: PathBuf::from("data"),
            model_dir: PathBuf::from("models"),
            predictions_file: None,
            required_datasets: datasets.clone(),
            datasets,
            auto_chain_cooldown_ms: DEFAULT_AUTO_CHAIN_COOLDOWN_MS,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            active_render_ms: DEFAULT_ACTIVE_RENDER_MS,
            idle_render_ms: DEFAULT_IDLE_RENDER_MS,
            snapshot_interval_ms: DEFAULT_SNAPSHOT_INTERVAL_MS,
            tick_ms: DEFAULT_TICK_MS,
            theme: "default".to_string(),
            log_level: "info".to_string(),
            log_file: None,
            backend: Backend::Simulated,
            commands: CommandTemplates::default(),
            warnings: Vec::new(),
        }
    }
}

/// TOML-deserializable config file format.
/// All fields are optional; missing fields use defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    auto_start_pipeline: Option<bool>,
    auto_train_after_download: Option<bool>,
    auto_submit: Option<bool>,
    data_dir: Option<PathBuf>,
    model_dir: Option<PathBuf>,
    predictions_file: Option<PathBuf>,
    datasets: Option<Vec<String>>,
    required_datasets: Option<Vec<String>>,
    auto_chain_cooldown_ms: Option<u64>,
    event_log_capacity: Option<usize>,
    active_render_ms: Option<u64>,
    idle_render_ms: Option<u64>,
    snapshot_interval_ms: Option<u64>,
    tick_ms: Option<u64>,
    theme: Option<String>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    backend: Option<String>,
    commands: Option<CommandTemplates>,
}

impl Config {
    /// Load config from `path`, falling back to defaults for any missing
    /// fields. A missing file yields pure defaults; a malformed one is an
    /// error the caller reports before continuing with defaults.
    pub fn load_from(path: &Path) -> Result<Self, toml::de::Error> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(_) => Ok(Config::default()), // No config file, use defaults
        }
    }

    /// Parse TOML text and merge it over the defaults.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file_config: FileConfig = toml::from_str(content)?;
        let mut config = Config::default();
        config.merge(file_config);
        Ok(config)
    }

    fn merge(&mut self, file: FileConfig) {
        if let Some(v) = file.auto_start_pipeline {
            self.auto_start_pipeline = v;
        }
        if let Some(v) = file.auto_train_after_download {
            self.auto_train_after_download = v;
        }
        if let Some(v) = file.auto_submit {
            self.auto_submit = v;
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = file.model_dir {
            self.model_dir = v;
        }
        if let Some(v) = file.predictions_file {
            self.predictions_file = Some(v);
        }

        if let Some(v) = file.datasets {
            if !v.is_empty() {
                self.datasets = v;
            }
        }
        self.required_datasets = file
            .required_datasets
            .unwrap_or_else(|| self.datasets.clone());
        // Only datasets that are actually downloaded can be required.
        let datasets = self.datasets.clone();
        let (required, dropped): (Vec<String>, Vec<String>) = self
            .required_datasets
            .drain(..)
            .partition(|r| datasets.contains(r));
        self.required_datasets = required;
        for name in dropped {
            self.warnings
                .push(format!("required dataset `{}` is not in `datasets`, ignoring", name));
        }

        if let Some(v) = file.auto_chain_cooldown_ms {
            self.auto_chain_cooldown_ms = v; // 0 = chain immediately
        }
        if let Some(v) = file.event_log_capacity {
            self.event_log_capacity = v.max(MIN_EVENT_LOG_CAPACITY);
        }
        if let Some(v) = file.active_render_ms {
            self.active_render_ms = v.max(MIN_RENDER_MS);
        }
        if let Some(v) = file.idle_render_ms {
            self.idle_render_ms = v.max(MIN_RENDER_MS);
        }
        if let Some(v) = file.snapshot_interval_ms {
            self.snapshot_interval_ms = v.max(MIN_SNAPSHOT_INTERVAL_MS);
        }
        if let Some(v) = file.tick_ms {
            self.tick_ms = v.clamp(MIN_TICK_MS, MAX_TICK_MS);
        }
        if let Some(v) = file.theme {
            if !v.is_empty() {
                self.theme = v;
            }
        }
        if let Some(v) = file.log_level {
            if !v.is_empty() {
                self.log_level = v;
            }
        }
        if let Some(v) = file.log_file {
            self.log_file = Some(v);
        }
        if let Some(v) = file.backend {
            match Backend::parse(&v) {
                Some(b) => self.backend = b,
                None => self
                    .warnings
                    .push(format!("unknown backend `{}`, keeping {:?}", v, self.backend)),
            }
        }
        if let Some(v) = file.commands {
            self.commands = v;
        }
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.predictions_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_PREDICTIONS_FILE))
    }

    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", name, DATASET_EXTENSION))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(default_log_path)
    }

    pub fn auto_chain_cooldown(&self) -> Duration {
        Duration::from_millis(self.auto_chain_cooldown_ms)
    }

    pub fn active_render_interval(&self) -> Duration {
        Duration::from_millis(self.active_render_ms)
    }

    pub fn idle_render_interval(&self) -> Duration {
        Duration::from_millis(self.idle_render_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
