//! Application-wide constants.
//!
//! Centralizes timing, capacities, and configuration defaults so the
//! controller, runner, and renderer agree on them.

use std::path::PathBuf;

// ── Timing ────────────────────────────────────────────────────────
/// Controller sleep between ticks (ms).
pub const DEFAULT_TICK_MS: u64 = 15;
/// Tick floor and ceiling to keep the loop responsive without spinning.
pub const MIN_TICK_MS: u64 = 5;
pub const MAX_TICK_MS: u64 = 50;
/// Render interval while an operation is active (ms).
pub const DEFAULT_ACTIVE_RENDER_MS: u64 = 150;
/// Render interval while idle (ms).
pub const DEFAULT_IDLE_RENDER_MS: u64 = 1000;
/// Lowest render interval accepted from config (ms).
pub const MIN_RENDER_MS: u64 = 50;
/// System snapshot polling interval (ms).
pub const DEFAULT_SNAPSHOT_INTERVAL_MS: u64 = 2000;
/// Lowest snapshot interval accepted from config (ms).
pub const MIN_SNAPSHOT_INTERVAL_MS: u64 = 250;
/// Delay between a finished download cycle and auto-started training (ms).
pub const DEFAULT_AUTO_CHAIN_COOLDOWN_MS: u64 = 1500;
/// How often a paused operation re-checks the pause flag (ms).
pub const PAUSE_POLL_MS: u64 = 100;
/// How long shutdown waits for a running operation to reach a checkpoint (ms).
pub const SHUTDOWN_WAIT_MS: u64 = 3000;
/// Simulated backend delay between progress steps (ms).
pub const SIMULATED_STEP_MS: u64 = 120;
/// Progress steps per simulated transfer.
pub const SIMULATED_TRANSFER_STEPS: u32 = 25;
/// Simulated training epochs.
pub const SIMULATED_EPOCHS: u32 = 10;
/// Simulated prediction row count.
pub const SIMULATED_ROWS: u64 = 5000;

// ── Capacities ────────────────────────────────────────────────────
/// Default number of events kept in the feed.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 50;
/// Minimum event log capacity.
pub const MIN_EVENT_LOG_CAPACITY: usize = 10;
/// Events printed to stdout after the terminal is restored.
pub const SHUTDOWN_EVENT_ECHO: usize = 5;
/// Lines of stderr kept from a failing external command.
pub const STDERR_TAIL_LINES: usize = 5;

// ── Pipeline ──────────────────────────────────────────────────────
/// Dataset download order.
pub const DEFAULT_DATASETS: &[&str] = &["train", "validation", "live"];
/// File extension for downloaded datasets.
pub const DATASET_EXTENSION: &str = "parquet";
/// Default predictions file name inside the data directory.
pub const DEFAULT_PREDICTIONS_FILE: &str = "predictions.csv";

// ── UI Layout ─────────────────────────────────────────────────────
/// Help overlay width.
pub const HELP_POPUP_WIDTH: u16 = 44;
/// Help overlay height.
pub const HELP_POPUP_HEIGHT: u16 = 14;
/// Fallback progress bar width when the terminal is too narrow to measure.
pub const MIN_BAR_WIDTH: usize = 10;

// ── Usage Color Thresholds ────────────────────────────────────────
/// Usage percentage above which color is "critical".
pub const USAGE_CRITICAL_PCT: f32 = 90.0;
/// Usage percentage above which color is "high".
pub const USAGE_HIGH_PCT: f32 = 70.0;
/// Usage percentage above which color is "mid".
pub const USAGE_MID_PCT: f32 = 40.0;

// ── Spinner Animation ─────────────────────────────────────────────
/// Spinner character sequence for the active operation.
pub const SPINNER_CHARS: &[&str] = &["◐", "◓", "◑", "◒"];

// ── Paths ─────────────────────────────────────────────────────────

/// Returns the user's home directory, falling back to /tmp.
pub fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// Returns `~/.config/tourney-dash/`.
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join("tourney-dash")
}

/// Returns `~/.config/tourney-dash/config.toml`.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Returns `~/.local/share/tourney-dash/`.
pub fn state_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("tourney-dash")
}

/// Returns the default log file path.
pub fn default_log_path() -> PathBuf {
    state_dir().join("tourney-dash.log")
}
