//! Dashboard controller and tick loop.
//!
//! Owns the shared state handles, the operation runner, the snapshot poller
//! and the keyboard dispatcher. Each tick polls one key, refreshes the
//! system snapshot when due and redraws when the throttle allows.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::constants::SHUTDOWN_WAIT_MS;
use crate::errors::TerminalError;
use crate::input::{Command, Input, InputDispatcher, TerminalDriver, TerminalGuard};
use crate::monitor::{SnapshotPoller, SnapshotProvider};
use crate::pipeline::{Job, ModelPipeline, OperationRunner, RunControl, TournamentApi};
use crate::state::{DownloadTracker, EventLog, ProgressState};
use crate::ui::theme::BUILTIN_THEME_NAMES;
use crate::ui::{self, FrameInput, RenderThrottle, RenderedFrame, Theme};

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Initializing,
    Running,
    ShuttingDown,
    Terminated,
}

/// Collaborators the controller is built from.
pub struct Collaborators {
    pub api: Arc<dyn TournamentApi>,
    pub pipeline: Arc<dyn ModelPipeline>,
    pub snapshots: Box<dyn SnapshotProvider>,
    pub terminal: Box<dyn TerminalDriver>,
}

pub struct DashboardController {
    state: ControllerState,
    auto_start: bool,
    tick_interval: Duration,

    progress: ProgressState,
    events: EventLog,
    downloads: DownloadTracker,
    control: RunControl,
    runner: OperationRunner,

    poller: SnapshotPoller,
    input: InputDispatcher,
    throttle: RenderThrottle,
    theme: Theme,

    show_help: bool,
    tick_count: u64,
}

impl DashboardController {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        let events = EventLog::new(config.event_log_capacity);
        let progress = ProgressState::new(events.clone());
        let downloads =
            DownloadTracker::new(config.datasets.clone(), config.required_datasets.clone());
        let control = RunControl::new();
        let runner = OperationRunner::new(
            config,
            progress.clone(),
            events.clone(),
            downloads.clone(),
            control.clone(),
            collaborators.api,
            collaborators.pipeline,
        );

        let theme = Theme::by_name(&config.theme).unwrap_or_else(|| {
            tracing::warn!(
                theme = %config.theme,
                available = ?BUILTIN_THEME_NAMES,
                "unknown theme, using default"
            );
            Theme::default()
        });

        Self {
            state: ControllerState::Initializing,
            auto_start: config.auto_start_pipeline,
            tick_interval: config.tick_interval(),
            progress,
            events,
            downloads,
            control,
            runner,
            poller: SnapshotPoller::new(
                collaborators.snapshots,
                config.data_dir.clone(),
                config.snapshot_interval(),
            ),
            input: InputDispatcher::new(collaborators.terminal),
            throttle: RenderThrottle::new(
                config.active_render_interval(),
                config.idle_render_interval(),
            ),
            theme,
            show_help: false,
            tick_count: 0,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Run until quit. The terminal is restored on every exit path.
    ///
    /// Only a terminal that cannot be acquired at all is an error; a missing
    /// raw mode just disables keyboard input.
    pub async fn run(&mut self) -> Result<(), TerminalError> {
        let mut guard = TerminalGuard::enter()?;
        self.start();

        while self.state == ControllerState::Running {
            let now = Instant::now();
            self.tick(now);
            if self.state != ControllerState::Running {
                break;
            }
            if self.render_due(now) {
                if let Err(e) = self.render(&mut guard, now) {
                    tracing::error!(error = %e, "render failed, shutting down");
                    self.events.error(format!("Terminal error: {}", e));
                    self.state = ControllerState::ShuttingDown;
                    break;
                }
            }
            tokio::time::sleep(self.tick_interval).await;
        }

        self.shutdown().await;
        guard.restore();
        Ok(())
    }

    /// Initializing → Running: acquire keyboard input and honour auto-start.
    pub fn start(&mut self) {
        if self.state != ControllerState::Initializing {
            return;
        }
        match self.input.enable() {
            Ok(()) => tracing::debug!("raw keyboard mode enabled"),
            Err(e) => {
                tracing::warn!(error = %e, "keyboard input disabled");
                self.events
                    .warning("Keyboard input unavailable; dashboard is display-only");
            }
        }
        self.state = ControllerState::Running;
        self.events.info("Dashboard started (press h for help)");

        if self.auto_start {
            tracing::info!("auto-starting download");
            let _ = self.runner.start(Job::Download);
        }
    }

    /// One controller step: at most one key, then the snapshot poll.
    pub fn tick(&mut self, now: Instant) {
        self.tick_count = self.tick_count.wrapping_add(1);

        if let Some(input) = self.input.try_next() {
            self.handle_input(input);
        }

        match self.poller.refresh_if_due(now) {
            Ok(true) => tracing::trace!("system snapshot refreshed"),
            Ok(false) => {}
            Err(e) => tracing::debug!(error = %e, "system snapshot failed"),
        }
    }

    pub fn handle_input(&mut self, input: Input) {
        match input {
            Input::Command(cmd) => self.handle_command(cmd),
            Input::Resize => self.throttle.force(),
            Input::Unknown(c) => {
                tracing::info!(key = %c.escape_debug(), "unrecognized key");
                self.events
                    .info(format!("Unknown key '{}' (h for help)", c.escape_debug()));
            }
        }
    }

    /// Apply one command. Long operations are spawned and return at once.
    pub fn handle_command(&mut self, cmd: Command) {
        tracing::debug!(?cmd, "command");
        match cmd {
            Command::Quit => {
                self.events.info("Shutting down");
                self.state = ControllerState::ShuttingDown;
            }
            Command::StartPipeline => self.launch(Job::FullPipeline),
            Command::DownloadOnly => self.launch(Job::Download),
            Command::TrainOnly => self.launch(Job::Train),
            Command::UploadOnly => self.launch(Job::Upload),
            Command::TogglePause => {
                if self.control.toggle_pause() {
                    self.events.info("Paused");
                } else {
                    self.events.info("Resumed");
                }
            }
            Command::Refresh => {}
            Command::Help => self.show_help = !self.show_help,
        }
        self.throttle.force();
    }

    fn launch(&mut self, job: Job) {
        // A busy runner already logged the warning event.
        if let Err(e) = self.runner.start(job) {
            tracing::debug!(%job, error = %e, "job rejected");
        }
    }

    fn render_due(&self, now: Instant) -> bool {
        self.throttle
            .is_due(now, !self.progress.current().is_idle())
    }

    fn render(&mut self, guard: &mut TerminalGuard, now: Instant) -> std::io::Result<()> {
        let theme = self.theme.clone();
        let terminal = guard.terminal_mut();
        let width = terminal.size()?.width;
        let rendered = self.build_frame(width);
        terminal.draw(|frame| ui::draw(frame, &rendered, &theme))?;
        self.throttle.rendered(now);
        Ok(())
    }

    /// Build the frame from one consistent read of each shared value.
    pub fn build_frame(&self, width: u16) -> RenderedFrame {
        let progress = self.progress.snapshot();
        let events = self.events.recent(self.events.capacity());
        let downloads = self.downloads.status();
        let input = FrameInput {
            progress: &progress,
            events: &events,
            snapshot: self.poller.latest(),
            downloads: &downloads,
            paused: self.control.is_paused(),
            input_enabled: self.input.is_enabled(),
            show_help: self.show_help,
            tick: self.tick_count,
            width,
        };
        ui::build_frame(&input, &self.theme)
    }

    /// ShuttingDown → Terminated: stop input, cancel the running job at its
    /// next checkpoint and wait for it to let go.
    pub async fn shutdown(&mut self) {
        if self.state == ControllerState::Terminated {
            return;
        }
        self.state = ControllerState::ShuttingDown;
        self.input.disable();
        self.control.stop();
        if !self
            .runner
            .wait_idle(Duration::from_millis(SHUTDOWN_WAIT_MS))
            .await
        {
            tracing::warn!(job = ?self.runner.active_job(), "operation still running at exit");
        }
        self.events.info("Dashboard stopped");
        tracing::info!(events = self.events.len(), "dashboard terminated");
        self.state = ControllerState::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::input::ScriptedDriver;
    use crate::models::{EventLevel, OperationKind};
    use crate::monitor::tests::FixedProvider;
    use crate::pipeline::simulated::{SimulatedPipeline, SimulatedTournament};

    fn collaborators(driver: ScriptedDriver, step_ms: u64) -> Collaborators {
        let step = Duration::from_millis(step_ms);
        Collaborators {
            api: Arc::new(SimulatedTournament::new(step, 3)),
            pipeline: Arc::new(SimulatedPipeline::new(step, 2, 10)),
            snapshots: Box::new(FixedProvider::new(20.0)),
            terminal: Box::new(driver),
        }
    }

    fn controller(driver: ScriptedDriver, step_ms: u64, configure: impl FnOnce(&mut Config)) -> (DashboardController, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = dir.path().join("data");
        config.model_dir = dir.path().join("models");
        config.auto_chain_cooldown_ms = 0;
        configure(&mut config);
        let mut c = DashboardController::new(&config, collaborators(driver, step_ms));
        c.start();
        (c, dir)
    }

    async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        for _ in 0..300 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn start_enters_running_with_raw_mode() {
        let driver = ScriptedDriver::default();
        let raw = driver.raw.clone();
        let (c, _dir) = controller(driver, 1, |_| {});
        assert_eq!(c.state(), ControllerState::Running);
        assert!(raw.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn raw_mode_failure_keeps_dashboard_running() {
        let driver = ScriptedDriver {
            refuse_raw: true,
            ..ScriptedDriver::default()
        };
        let (c, _dir) = controller(driver, 1, |_| {});
        assert_eq!(c.state(), ControllerState::Running);
        assert_eq!(c.events().count_level(EventLevel::Warning), 1);
        assert!(c.build_frame(80).to_text().contains("keyboard unavailable"));
    }

    #[tokio::test]
    async fn one_key_per_tick_and_unknown_keys_are_logged() {
        let (mut c, _dir) = controller(ScriptedDriver::with_keys("xq"), 1, |_| {});
        c.tick(Instant::now());
        assert_eq!(c.state(), ControllerState::Running);
        let last = &c.events().recent(1)[0];
        assert_eq!(last.level, EventLevel::Info);
        assert!(last.message.contains("'x'"));

        c.tick(Instant::now());
        assert_eq!(c.state(), ControllerState::ShuttingDown);
    }

    #[tokio::test]
    async fn download_key_twice_runs_one_sequence() {
        let (mut c, _dir) = controller(ScriptedDriver::default(), 20, |cfg| {
            cfg.auto_train_after_download = false
        });
        c.handle_command(Command::DownloadOnly);
        assert!(wait_for(|| c.progress.current() == OperationKind::Downloading).await);
        c.handle_command(Command::DownloadOnly);
        assert_eq!(c.events().count_level(EventLevel::Warning), 1);

        assert!(c.runner.wait_idle(Duration::from_secs(5)).await);
        assert_eq!(c.events().count_level(EventLevel::Success), 3);
    }

    #[tokio::test]
    async fn pause_toggles_control_and_logs() {
        let (mut c, _dir) = controller(ScriptedDriver::default(), 1, |_| {});
        c.handle_command(Command::TogglePause);
        assert!(c.control.is_paused());
        assert_eq!(c.events().recent(1)[0].message, "Paused");
        assert!(c.build_frame(80).to_text().contains("PAUSED"));
        c.handle_command(Command::TogglePause);
        assert!(!c.control.is_paused());
        assert_eq!(c.events().recent(1)[0].message, "Resumed");
    }

    #[tokio::test]
    async fn help_and_refresh_force_redraw() {
        let (mut c, _dir) = controller(ScriptedDriver::default(), 1, |_| {});
        let now = Instant::now();
        c.throttle.rendered(now);
        assert!(!c.render_due(now));
        c.handle_command(Command::Refresh);
        assert!(c.render_due(now));

        c.throttle.rendered(now);
        c.handle_command(Command::Help);
        assert!(c.render_due(now));
        assert!(c.build_frame(80).help.is_some());
        c.handle_command(Command::Help);
        assert!(c.build_frame(80).help.is_none());
    }

    #[tokio::test]
    async fn resize_forces_redraw() {
        let (mut c, _dir) = controller(ScriptedDriver::default(), 1, |_| {});
        let now = Instant::now();
        c.throttle.rendered(now);
        c.handle_input(Input::Resize);
        assert!(c.render_due(now));
    }

    #[tokio::test]
    async fn snapshot_refreshes_on_tick() {
        let (mut c, _dir) = controller(ScriptedDriver::default(), 1, |_| {});
        assert!(c.poller.latest().is_none());
        c.tick(Instant::now());
        assert_eq!(c.poller.latest().unwrap().cpu_pct, 20.0);
        assert!(c.build_frame(100).to_text().contains("CPU 20%"));
    }

    #[tokio::test]
    async fn auto_start_launches_download_and_chain() {
        let (c, _dir) = controller(ScriptedDriver::default(), 1, |cfg| {
            cfg.auto_start_pipeline = true
        });
        assert!(c.runner.active_job().is_some());
        assert!(c.runner.wait_idle(Duration::from_secs(5)).await);
        let messages: Vec<_> = c
            .events()
            .recent(50)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert!(messages.iter().any(|m| m == "Training complete"));
    }

    #[tokio::test]
    async fn shutdown_cancels_job_and_releases_terminal() {
        let driver = ScriptedDriver::default();
        let raw = driver.raw.clone();
        let (mut c, _dir) = controller(driver, 50, |_| {});
        c.handle_command(Command::StartPipeline);
        assert!(wait_for(|| !c.progress.current().is_idle()).await);

        c.handle_command(Command::Quit);
        assert_eq!(c.state(), ControllerState::ShuttingDown);
        c.shutdown().await;

        assert_eq!(c.state(), ControllerState::Terminated);
        assert!(!raw.load(Ordering::SeqCst));
        assert!(!c.control.is_running());
        assert!(c.runner.active_job().is_none());
        assert!(c.progress.current().is_idle());
        assert_eq!(c.events().recent(1)[0].message, "Dashboard stopped");
    }
}
