use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::{JoinError, JoinHandle};

use crate::config::Config;
use crate::errors::OperationError;
use crate::models::OperationKind;
use crate::state::{DownloadTracker, EventLog, ProgressState};
use crate::utils::capitalize;

use super::sink::Outcome;
use super::{ModelPipeline, ProgressSink, RunControl, TournamentApi};

/// A unit of work started from one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// New download cycle, then download → train → predict → upload.
    FullPipeline,
    /// Download missing datasets, then follow the auto-chain policy.
    Download,
    Train,
    Upload,
}

impl Job {
    pub fn label(&self) -> &'static str {
        match self {
            Job::FullPipeline => "full pipeline",
            Job::Download => "download",
            Job::Train => "training",
            Job::Upload => "upload",
        }
    }

    /// Operation the job begins with.
    pub fn first_kind(&self) -> OperationKind {
        match self {
            Job::FullPipeline | Job::Download => OperationKind::Downloading,
            Job::Train => OperationKind::Training,
            Job::Upload => OperationKind::Uploading,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Path and timing settings the runner reads from `Config`.
#[derive(Debug, Clone)]
struct RunnerSettings {
    data_dir: PathBuf,
    model_dir: PathBuf,
    predictions: PathBuf,
    dataset_paths: Vec<(String, PathBuf)>,
    auto_train_after_download: bool,
    auto_submit: bool,
    cooldown: Duration,
}

impl RunnerSettings {
    fn from_config(config: &Config) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            model_dir: config.model_dir.clone(),
            predictions: config.predictions_path(),
            dataset_paths: config
                .datasets
                .iter()
                .map(|d| (d.clone(), config.dataset_path(d)))
                .collect(),
            auto_train_after_download: config.auto_train_after_download,
            auto_submit: config.auto_submit,
            cooldown: config.auto_chain_cooldown(),
        }
    }
}

struct Inner {
    progress: ProgressState,
    events: EventLog,
    downloads: DownloadTracker,
    control: RunControl,
    api: Arc<dyn TournamentApi>,
    pipeline: Arc<dyn ModelPipeline>,
    settings: RunnerSettings,
    /// Job currently holding the runner. Held across the gaps between
    /// chained operations so nothing can slip in between them.
    active: Mutex<Option<Job>>,
}

/// Releases the runner slot when the job task ends, however it ends.
struct SlotGuard(Arc<Inner>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        match self.0.active.lock() {
            Ok(mut a) => *a = None,
            Err(e) => *e.into_inner() = None,
        }
    }
}

/// Runs one job at a time as a spawned task, feeding collaborator
/// progress into the shared state.
#[derive(Clone)]
pub struct OperationRunner {
    inner: Arc<Inner>,
}

impl OperationRunner {
    pub fn new(
        config: &Config,
        progress: ProgressState,
        events: EventLog,
        downloads: DownloadTracker,
        control: RunControl,
        api: Arc<dyn TournamentApi>,
        pipeline: Arc<dyn ModelPipeline>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                progress,
                events,
                downloads,
                control,
                api,
                pipeline,
                settings: RunnerSettings::from_config(config),
                active: Mutex::new(None),
            }),
        }
    }

    /// Job currently running, if any.
    pub fn active_job(&self) -> Option<Job> {
        match self.inner.active.lock() {
            Ok(a) => *a,
            Err(e) => *e.into_inner(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active_job().is_some() || !self.inner.progress.current().is_idle()
    }

    /// Spawn `job` and return immediately.
    ///
    /// Fails with `OperationInProgress` (and a warning event) if another
    /// job or operation is active. Must be called inside a tokio runtime.
    pub fn start(&self, job: Job) -> Result<JoinHandle<()>, OperationError> {
        {
            let mut active = match self.inner.active.lock() {
                Ok(a) => a,
                Err(e) => e.into_inner(),
            };
            let current = self.inner.progress.current();
            if active.is_some() || !current.is_idle() {
                let busy_kind = if current.is_idle() {
                    (*active).map(|j| j.first_kind()).unwrap_or(current)
                } else {
                    current
                };
                let err = OperationError::OperationInProgress {
                    requested: job.label().to_string(),
                    active: busy_kind,
                };
                self.inner.events.warning(format!("Cannot start {}", err_detail(&err)));
                return Err(err);
            }
            *active = Some(job);
        }

        tracing::info!(%job, "job started");
        let guard = SlotGuard(Arc::clone(&self.inner));
        Ok(tokio::spawn(async move {
            let inner = Arc::clone(&guard.0);
            let worker = Arc::clone(&inner);
            // Inner task so a panicking collaborator surfaces as a JoinError.
            if let Err(e) = tokio::spawn(async move { worker.run_job(job).await }).await {
                inner.recover(job, e);
            }
            drop(guard);
        }))
    }

    /// Wait until no job holds the runner, up to `timeout`.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_busy() {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}

fn err_detail(err: &OperationError) -> String {
    match err {
        OperationError::OperationInProgress { requested, active } => {
            format!("{}: {} in progress", requested, active)
        }
        other => other.to_string(),
    }
}

impl Inner {
    async fn run_job(&self, job: Job) {
        let started = Instant::now();
        let result = match job {
            Job::FullPipeline => self.full_pipeline().await,
            Job::Download => match self.download_all().await {
                Ok(()) => self.auto_chain().await,
                Err(e) => Err(e),
            },
            Job::Train => self.train().await,
            Job::Upload => self.upload().await,
        };

        match result {
            Ok(()) => tracing::info!(%job, elapsed = ?started.elapsed(), "job finished"),
            Err(OperationError::Cancelled) => {
                self.progress.reset();
                self.events.warning(format!("{} cancelled", capitalize(job.label())));
            }
            Err(e) => {
                tracing::warn!(%job, error = %e, "job halted");
            }
        }
    }

    /// Put shared state back to idle after the job task died.
    fn recover(&self, job: Job, err: JoinError) {
        let reason = if err.is_panic() {
            format!("{} panicked: {}", job.label(), panic_message(err))
        } else {
            format!("{} aborted", job.label())
        };
        tracing::error!(%job, %reason, "job task died");
        self.downloads.fail_in_progress();
        let current = self.progress.current();
        if current.is_idle() {
            self.events.error(capitalize(&reason));
        } else if let Err(e) = self.progress.fail(current, &reason) {
            tracing::warn!(error = %e, "could not fail operation, resetting");
            self.progress.reset();
        }
    }

    async fn full_pipeline(&self) -> Result<(), OperationError> {
        self.downloads.new_cycle();
        self.events.info("Starting full pipeline");
        self.download_all().await?;
        self.train().await?;
        self.predict().await?;
        self.upload().await?;
        self.events.success("Pipeline finished");
        Ok(())
    }

    /// Download every configured dataset in order, one at a time, skipping
    /// those already completed this cycle.
    async fn download_all(&self) -> Result<(), OperationError> {
        let mut downloaded = 0usize;
        for (name, dest) in &self.settings.dataset_paths {
            self.control.checkpoint().await?;
            if !self.downloads.start(name) {
                tracing::debug!(dataset = %name, "already downloaded, skipping");
                continue;
            }
            let sink = self
                .sink(OperationKind::Downloading, Some(name.clone()))
                .with_tracker(self.downloads.clone());
            let result = self.api.download_dataset(name, dest, &sink).await;
            if let Err(e) = self.settle(&sink, result) {
                self.downloads
                    .abandon(name, !matches!(e, OperationError::Cancelled));
                return Err(e);
            }
            downloaded += 1;
        }
        if downloaded == 0 {
            self.events.info("All datasets already downloaded");
        } else if self.downloads.all_required_completed() {
            self.events.info("All required datasets downloaded");
        }
        Ok(())
    }

    /// download → (auto_train_after_download) train → (auto_submit) predict + upload.
    async fn auto_chain(&self) -> Result<(), OperationError> {
        if !self.settings.auto_train_after_download {
            return Ok(());
        }
        if !self.downloads.all_required_completed() {
            self.events
                .info("Auto-train skipped: required datasets not downloaded");
            return Ok(());
        }
        if self.progress.current() == OperationKind::Training {
            return Ok(());
        }
        self.control.sleep(self.settings.cooldown).await?;
        self.events.info("Datasets ready, starting training");
        self.train().await?;
        if self.settings.auto_submit {
            self.predict().await?;
            self.upload().await?;
        }
        Ok(())
    }

    async fn train(&self) -> Result<(), OperationError> {
        self.control.checkpoint().await?;
        let sink = self.sink(OperationKind::Training, None);
        let result = self
            .pipeline
            .train(&self.settings.data_dir, &self.settings.model_dir, &sink)
            .await;
        self.settle(&sink, result)
    }

    async fn predict(&self) -> Result<(), OperationError> {
        self.control.checkpoint().await?;
        let sink = self.sink(OperationKind::Predicting, None);
        let result = self
            .pipeline
            .predict(
                &self.settings.data_dir,
                &self.settings.model_dir,
                &self.settings.predictions,
                &sink,
            )
            .await;
        self.settle(&sink, result)
    }

    async fn upload(&self) -> Result<(), OperationError> {
        self.control.checkpoint().await?;
        let path = &self.settings.predictions;
        if !path.exists() {
            let reason = format!("predictions file not found: {}", path.display());
            self.progress.fail(OperationKind::Uploading, &reason)?;
            return Err(OperationError::CollaboratorFailure {
                kind: OperationKind::Uploading,
                reason,
            });
        }
        let sink = self.sink(OperationKind::Uploading, None);
        let result = self.api.upload_predictions(path, &sink).await;
        self.settle(&sink, result)
    }

    fn sink(&self, kind: OperationKind, subject: Option<String>) -> ProgressSink {
        ProgressSink::new(
            kind,
            subject,
            self.progress.clone(),
            self.events.clone(),
            self.control.clone(),
        )
    }

    /// Turn what the collaborator reported and returned into one outcome,
    /// closing any operation it left open.
    fn settle(&self, sink: &ProgressSink, result: anyhow::Result<()>) -> Result<(), OperationError> {
        let kind = sink.kind();
        if let Outcome::Failed(reason) = sink.outcome() {
            return Err(OperationError::CollaboratorFailure { kind, reason });
        }
        match result {
            Err(e) if is_cancelled(&e) || !self.control.is_running() => {
                if self.progress.current() == kind {
                    self.progress.reset();
                }
                Err(OperationError::Cancelled)
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                sink.error(reason.clone());
                Err(OperationError::CollaboratorFailure { kind, reason })
            }
            Ok(()) => {
                if sink.outcome() != Outcome::Completed {
                    sink.complete();
                }
                match sink.outcome() {
                    Outcome::Completed => Ok(()),
                    _ => Err(OperationError::CollaboratorFailure {
                        kind,
                        reason: "operation could not be completed".to_string(),
                    }),
                }
            }
        }
    }
}

fn panic_message(err: JoinError) -> String {
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn is_cancelled(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<OperationError>(),
        Some(OperationError::Cancelled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::models::{EventLevel, Phase, ProgressFields};
    use crate::state::DatasetState;

    #[derive(Default)]
    struct FakeApi {
        step: Duration,
        fail_on: Option<(&'static str, &'static str)>,
        panic_on: Option<&'static str>,
        downloads: Mutex<Vec<String>>,
        uploads: AtomicUsize,
        open: AtomicUsize,
        max_open: AtomicUsize,
    }

    impl FakeApi {
        fn calls(&self) -> Vec<String> {
            self.downloads.lock().unwrap().clone()
        }

        async fn transfer(&self, name: &str, progress: &ProgressSink) -> anyhow::Result<()> {
            progress.start();
            if self.panic_on == Some(name) {
                panic!("connection pool poisoned while fetching {}", name);
            }
            for pct in [25.0, 50.0, 75.0] {
                progress.checkpoint().await?;
                tokio::time::sleep(self.step).await;
                progress.update(ProgressFields::percent(pct));
            }
            if let Some((dataset, reason)) = self.fail_on {
                if dataset == name {
                    progress.report(Phase::Error, ProgressFields::message(reason));
                    return Ok(());
                }
            }
            progress.complete();
            Ok(())
        }
    }

    #[async_trait]
    impl TournamentApi for FakeApi {
        async fn download_dataset(
            &self,
            name: &str,
            _dest: &Path,
            progress: &ProgressSink,
        ) -> anyhow::Result<()> {
            self.downloads.lock().unwrap().push(name.to_string());
            let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_open.fetch_max(open, Ordering::SeqCst);
            let result = self.transfer(name, progress).await;
            self.open.fetch_sub(1, Ordering::SeqCst);
            result
        }

        async fn upload_predictions(
            &self,
            _predictions: &Path,
            progress: &ProgressSink,
        ) -> anyhow::Result<()> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            progress.start();
            progress.complete();
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePipeline {
        step: Duration,
        trains: AtomicUsize,
        predicts: AtomicUsize,
    }

    #[async_trait]
    impl ModelPipeline for FakePipeline {
        async fn train(
            &self,
            _data_dir: &Path,
            _model_dir: &Path,
            progress: &ProgressSink,
        ) -> anyhow::Result<()> {
            self.trains.fetch_add(1, Ordering::SeqCst);
            progress.start();
            progress.checkpoint().await?;
            tokio::time::sleep(self.step).await;
            progress.update(ProgressFields::percent(50.0));
            Ok(()) // runner closes the operation
        }

        async fn predict(
            &self,
            _data_dir: &Path,
            _model_dir: &Path,
            output: &Path,
            progress: &ProgressSink,
        ) -> anyhow::Result<()> {
            self.predicts.fetch_add(1, Ordering::SeqCst);
            progress.start();
            std::fs::create_dir_all(output.parent().unwrap())?;
            std::fs::write(output, "id,prediction\n")?;
            progress.complete();
            Ok(())
        }
    }

    struct Harness {
        runner: OperationRunner,
        progress: ProgressState,
        events: EventLog,
        downloads: DownloadTracker,
        control: RunControl,
        api: Arc<FakeApi>,
        pipeline: Arc<FakePipeline>,
        config: Config,
        _dir: tempfile::TempDir,
    }

    fn harness(api: FakeApi, pipeline: FakePipeline, configure: impl FnOnce(&mut Config)) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = dir.path().join("data");
        config.model_dir = dir.path().join("models");
        config.auto_chain_cooldown_ms = 0;
        configure(&mut config);

        let events = EventLog::new(50);
        let progress = ProgressState::new(events.clone());
        let downloads =
            DownloadTracker::new(config.datasets.clone(), config.required_datasets.clone());
        let control = RunControl::new();
        let api = Arc::new(api);
        let pipeline = Arc::new(pipeline);
        let runner = OperationRunner::new(
            &config,
            progress.clone(),
            events.clone(),
            downloads.clone(),
            control.clone(),
            api.clone(),
            pipeline.clone(),
        );
        Harness {
            runner,
            progress,
            events,
            downloads,
            control,
            api,
            pipeline,
            config,
            _dir: dir,
        }
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

    fn download_successes(events: &EventLog) -> usize {
        events
            .recent(events.capacity())
            .iter()
            .filter(|e| e.level == EventLevel::Success && e.message.starts_with("Download complete"))
            .count()
    }

    #[tokio::test]
    async fn downloads_run_sequentially_then_auto_train() {
        let h = harness(
            FakeApi::default(),
            FakePipeline {
                step: Duration::from_millis(300),
                ..FakePipeline::default()
            },
            |_| {},
        );
        let handle = h.runner.start(Job::Download).unwrap();

        assert!(wait_for(|| h.progress.current() == OperationKind::Training).await);
        assert_eq!(download_successes(&h.events), 3);
        assert_eq!(h.api.calls(), vec!["train", "validation", "live"]);

        handle.await.unwrap();
        assert_eq!(h.pipeline.trains.load(Ordering::SeqCst), 1);
        assert!(h.progress.current().is_idle());
        assert!(h.downloads.all_required_completed());
        assert!(h.runner.active_job().is_none());
    }

    #[tokio::test]
    async fn only_one_download_active_at_a_time() {
        let h = harness(
            FakeApi {
                step: Duration::from_millis(5),
                ..FakeApi::default()
            },
            FakePipeline::default(),
            |c| c.auto_train_after_download = false,
        );
        h.runner.start(Job::Download).unwrap().await.unwrap();
        assert_eq!(h.api.max_open.load(Ordering::SeqCst), 1);
        assert_eq!(h.api.calls(), vec!["train", "validation", "live"]);
    }

    #[tokio::test]
    async fn second_download_press_is_rejected() {
        let h = harness(
            FakeApi {
                step: Duration::from_millis(20),
                ..FakeApi::default()
            },
            FakePipeline::default(),
            |c| c.auto_train_after_download = false,
        );
        let handle = h.runner.start(Job::Download).unwrap();
        assert!(wait_for(|| h.progress.current() == OperationKind::Downloading).await);

        let before = h.progress.snapshot();
        let err = h.runner.start(Job::Download).unwrap_err();
        assert!(matches!(err, OperationError::OperationInProgress { .. }));
        assert_eq!(h.events.count_level(EventLevel::Warning), 1);
        assert_eq!(h.progress.current(), before.current);

        handle.await.unwrap();
        assert_eq!(h.api.calls().len(), 3);
    }

    #[tokio::test]
    async fn completed_datasets_are_skipped() {
        let h = harness(FakeApi::default(), FakePipeline::default(), |c| {
            c.auto_train_after_download = false
        });
        h.downloads.start("train");
        h.downloads.finish("train");

        h.runner.start(Job::Download).unwrap().await.unwrap();
        assert_eq!(h.api.calls(), vec!["validation", "live"]);

        h.runner.start(Job::Download).unwrap().await.unwrap();
        assert_eq!(h.api.calls().len(), 2);
        let last = &h.events.recent(1)[0];
        assert_eq!(last.message, "All datasets already downloaded");
    }

    #[tokio::test]
    async fn collaborator_error_halts_chain() {
        let h = harness(
            FakeApi {
                fail_on: Some(("validation", "network timeout")),
                ..FakeApi::default()
            },
            FakePipeline::default(),
            |_| {},
        );
        h.runner.start(Job::Download).unwrap().await.unwrap();

        assert!(h.progress.current().is_idle());
        assert_eq!(h.pipeline.trains.load(Ordering::SeqCst), 0);
        // Sequence stops at the failed dataset.
        assert_eq!(h.api.calls(), vec!["train", "validation"]);
        let errors: Vec<_> = h
            .events
            .recent(50)
            .into_iter()
            .filter(|e| e.level == EventLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("network timeout"));

        let status = h.downloads.status();
        assert_eq!(status.datasets[1], ("validation".into(), DatasetState::Failed));
        assert!(!status.required_met);
    }

    #[tokio::test]
    async fn no_auto_train_when_disabled_or_not_required() {
        let h = harness(FakeApi::default(), FakePipeline::default(), |c| {
            c.auto_train_after_download = false
        });
        h.runner.start(Job::Download).unwrap().await.unwrap();
        assert_eq!(h.pipeline.trains.load(Ordering::SeqCst), 0);

        let h = harness(FakeApi::default(), FakePipeline::default(), |c| {
            c.datasets = vec!["train".into(), "live".into()];
            c.required_datasets = vec!["train".into(), "validation".into()];
        });
        h.runner.start(Job::Download).unwrap().await.unwrap();
        assert_eq!(h.pipeline.trains.load(Ordering::SeqCst), 0);
        assert_eq!(
            h.events.recent(1)[0].message,
            "Auto-train skipped: required datasets not downloaded"
        );
    }

    #[tokio::test]
    async fn auto_submit_predicts_and_uploads() {
        let h = harness(FakeApi::default(), FakePipeline::default(), |c| {
            c.auto_submit = true
        });
        h.runner.start(Job::Download).unwrap().await.unwrap();
        assert_eq!(h.pipeline.trains.load(Ordering::SeqCst), 1);
        assert_eq!(h.pipeline.predicts.load(Ordering::SeqCst), 1);
        assert_eq!(h.api.uploads.load(Ordering::SeqCst), 1);
        assert!(h.config.predictions_path().exists());
    }

    #[tokio::test]
    async fn full_pipeline_starts_new_cycle() {
        let h = harness(FakeApi::default(), FakePipeline::default(), |_| {});
        h.downloads.start("live");
        h.downloads.finish("live");

        h.runner.start(Job::FullPipeline).unwrap().await.unwrap();
        assert_eq!(h.api.calls(), vec!["train", "validation", "live"]);
        assert_eq!(h.pipeline.trains.load(Ordering::SeqCst), 1);
        assert_eq!(h.api.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(h.events.recent(1)[0].message, "Pipeline finished");
    }

    #[tokio::test]
    async fn upload_without_predictions_fails() {
        let h = harness(FakeApi::default(), FakePipeline::default(), |_| {});
        h.runner.start(Job::Upload).unwrap().await.unwrap();
        assert_eq!(h.api.uploads.load(Ordering::SeqCst), 0);
        let last = &h.events.recent(1)[0];
        assert_eq!(last.level, EventLevel::Error);
        assert!(last.message.contains("predictions file not found"));
        assert!(h.progress.current().is_idle());
    }

    #[tokio::test]
    async fn pause_holds_progress_then_resumes() {
        let h = harness(
            FakeApi {
                step: Duration::from_millis(40),
                ..FakeApi::default()
            },
            FakePipeline::default(),
            |c| c.auto_train_after_download = false,
        );
        let handle = h.runner.start(Job::Download).unwrap();
        assert!(wait_for(|| h.progress.snapshot().progress_pct >= 25.0).await);

        h.control.set_paused(true);
        tokio::time::sleep(Duration::from_millis(120)).await;
        let held = h.progress.snapshot();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let later = h.progress.snapshot();
        assert_eq!(held.current, later.current);
        assert_eq!(held.progress_pct, later.progress_pct);
        assert!(!later.is_idle());

        h.control.set_paused(false);
        handle.await.unwrap();
        assert_eq!(download_successes(&h.events), 3);
        assert!(h.progress.current().is_idle());
    }

    #[tokio::test]
    async fn stop_cancels_job_and_releases_slot() {
        let h = harness(
            FakeApi {
                step: Duration::from_millis(50),
                ..FakeApi::default()
            },
            FakePipeline::default(),
            |_| {},
        );
        let handle = h.runner.start(Job::Download).unwrap();
        assert!(wait_for(|| h.progress.current() == OperationKind::Downloading).await);
        h.control.stop();
        handle.await.unwrap();

        assert!(h.progress.current().is_idle());
        assert!(h.runner.active_job().is_none());
        assert_eq!(h.pipeline.trains.load(Ordering::SeqCst), 0);
        assert_eq!(h.events.recent(1)[0].message, "Download cancelled");
        // Interrupted dataset is neither completed nor failed.
        assert_eq!(h.downloads.status().datasets[0].1, DatasetState::Pending);
        assert!(h.runner.wait_idle(Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn collaborator_panic_resets_state_and_frees_runner() {
        let h = harness(
            FakeApi {
                panic_on: Some("validation"),
                ..FakeApi::default()
            },
            FakePipeline::default(),
            |_| {},
        );
        h.runner.start(Job::Download).unwrap().await.unwrap();

        assert!(h.progress.current().is_idle());
        assert!(h.runner.active_job().is_none());
        assert_eq!(h.pipeline.trains.load(Ordering::SeqCst), 0);
        let last = &h.events.recent(1)[0];
        assert_eq!(last.level, EventLevel::Error);
        assert!(last.message.contains("download panicked"));
        assert!(last.message.contains("connection pool poisoned"));
        let status = h.downloads.status();
        assert_eq!(status.datasets[0].1, DatasetState::Completed);
        assert_eq!(status.datasets[1].1, DatasetState::Failed);

        // The dashboard can run the next command.
        h.runner.start(Job::Train).unwrap().await.unwrap();
        assert_eq!(h.pipeline.trains.load(Ordering::SeqCst), 1);
    }
}
