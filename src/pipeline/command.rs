//! Shell-command backend.
//!
//! Each stage runs a user-configured `sh -c` template. The command reports
//! progress by printing JSON lines on stdout:
//!
//! ```text
//! {"phase":"start","message":"Fetching train"}
//! {"phase":"progress","progress":42.0,"current_mb":420,"total_mb":1000}
//! {"phase":"complete"}
//! ```
//!
//! Placeholder values are substituted already single-quoted, so templates
//! use `{dest}` rather than `"{dest}"`.
//!
//! Any other stdout line is logged at debug level. A non-zero exit fails the
//! operation with the tail of stderr as the reason.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::config::{CommandTemplates, Config};
use crate::constants::{PAUSE_POLL_MS, STDERR_TAIL_LINES};
use crate::errors::OperationError;
use crate::models::{Phase, ProgressFields};

use super::{ModelPipeline, ProgressSink, TournamentApi};

/// One progress line printed by a command.
#[derive(Debug, Deserialize)]
struct ProgressLine {
    phase: Phase,
    #[serde(flatten)]
    fields: ProgressFields,
}

/// Runs the configured templates for every stage.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    templates: CommandTemplates,
    data_dir: PathBuf,
    model_dir: PathBuf,
}

impl CommandBackend {
    pub fn new(templates: CommandTemplates, data_dir: PathBuf, model_dir: PathBuf) -> Self {
        Self {
            templates,
            data_dir,
            model_dir,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.commands.clone(),
            config.data_dir.clone(),
            config.model_dir.clone(),
        )
    }

    fn vars<'a>(&'a self, extra: &[(&'a str, String)]) -> Vec<(&'a str, String)> {
        let mut vars = vec![
            ("data_dir", self.data_dir.display().to_string()),
            ("model_dir", self.model_dir.display().to_string()),
        ];
        vars.extend(extra.iter().cloned());
        vars
    }

    async fn run_stage(
        &self,
        stage: &str,
        template: Option<&String>,
        vars: &[(&str, String)],
        progress: &ProgressSink,
    ) -> anyhow::Result<()> {
        let template =
            template.with_context(|| format!("no `{}` command configured", stage))?;
        let script = substitute(template, vars);
        tracing::debug!(stage, %script, "spawning command");
        run_reporting(stage, &script, progress).await
    }
}

#[async_trait]
impl TournamentApi for CommandBackend {
    async fn download_dataset(
        &self,
        name: &str,
        dest: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let vars = self.vars(&[
            ("dataset", name.to_string()),
            ("dest", dest.display().to_string()),
        ]);
        self.run_stage("download", self.templates.download.as_ref(), &vars, progress)
            .await
    }

    async fn upload_predictions(
        &self,
        predictions: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()> {
        let vars = self.vars(&[("predictions", predictions.display().to_string())]);
        self.run_stage("upload", self.templates.upload.as_ref(), &vars, progress)
            .await
    }
}

#[async_trait]
impl ModelPipeline for CommandBackend {
    async fn train(
        &self,
        _data_dir: &Path,
        model_dir: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()> {
        std::fs::create_dir_all(model_dir)
            .with_context(|| format!("creating {}", model_dir.display()))?;
        let vars = self.vars(&[]);
        self.run_stage("train", self.templates.train.as_ref(), &vars, progress)
            .await
    }

    async fn predict(
        &self,
        _data_dir: &Path,
        _model_dir: &Path,
        output: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let vars = self.vars(&[("predictions", output.display().to_string())]);
        self.run_stage("predict", self.templates.predict.as_ref(), &vars, progress)
            .await
    }
}

/// Replace `{name}` placeholders with single-quoted values. Unknown braces
/// are left alone so JSON in the template survives.
fn substitute(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), &shell_quote(value))
    })
}

/// Quote `value` as one `sh` word.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Spawn `script`, forward its progress lines and wait for it.
///
/// The child is killed if shutdown is requested while it runs.
async fn run_reporting(stage: &str, script: &str, progress: &ProgressSink) -> anyhow::Result<()> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning {} command", stage))?;

    let stdout = child.stdout.take().context("command stdout not captured")?;
    let stderr = child.stderr.take().context("command stderr not captured")?;
    let stderr_tail = tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail.into_iter().collect::<Vec<_>>().join("\n")
    });

    let mut lines = BufReader::new(stdout).lines();
    let poll = Duration::from_millis(PAUSE_POLL_MS);
    let status: ExitStatus = loop {
        tokio::select! {
            line = lines.next_line() => match line.context("reading command output")? {
                Some(line) => {
                    forward_line(stage, &line, progress);
                    if let Err(e) = progress.checkpoint().await {
                        let _ = child.kill().await;
                        return Err(e.into());
                    }
                }
                None => break child.wait().await.context("waiting for command")?,
            },
            _ = tokio::time::sleep(poll) => {
                if progress.is_cancelled() {
                    let _ = child.kill().await;
                    return Err(OperationError::Cancelled.into());
                }
            }
        }
    };

    let tail = stderr_tail.await.unwrap_or_default();
    if !status.success() {
        if tail.is_empty() {
            bail!("{} command exited with {}", stage, status);
        }
        bail!("{} command exited with {}: {}", stage, status, tail);
    }
    Ok(())
}

fn forward_line(stage: &str, line: &str, progress: &ProgressSink) {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        tracing::debug!(stage, output = trimmed, "command output");
        return;
    }
    match serde_json::from_str::<ProgressLine>(trimmed) {
        Ok(report) => progress.report(report.phase, report.fields),
        Err(e) => tracing::debug!(stage, error = %e, output = trimmed, "unparsed progress line"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventLevel, OperationKind};
    use crate::pipeline::RunControl;
    use crate::state::{EventLog, ProgressState};

    fn make_sink(
        kind: OperationKind,
        control: RunControl,
    ) -> (ProgressSink, ProgressState, EventLog) {
        let events = EventLog::new(20);
        let progress = ProgressState::new(events.clone());
        let sink = ProgressSink::new(
            kind,
            Some("train".into()),
            progress.clone(),
            events.clone(),
            control,
        );
        (sink, progress, events)
    }

    fn backend(dir: &Path, templates: CommandTemplates) -> CommandBackend {
        CommandBackend::new(templates, dir.join("data"), dir.join("models"))
    }

    #[test]
    fn substitute_replaces_known_placeholders_only() {
        let out = substitute(
            r#"fetch {dataset} > {dest}; echo '{"phase":"complete"}'"#,
            &[("dataset", "live".into()), ("dest", "/tmp/live.parquet".into())],
        );
        assert_eq!(
            out,
            r#"fetch 'live' > '/tmp/live.parquet'; echo '{"phase":"complete"}'"#
        );
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("a b"), "'a b'");
    }

    #[tokio::test]
    async fn values_with_spaces_and_metacharacters_stay_one_word() {
        let dir = tempfile::tempdir().unwrap();
        let templates = CommandTemplates {
            download: Some(r#"printf '%s' {dataset} > {dest}"#.into()),
            ..CommandTemplates::default()
        };
        let api = CommandBackend::new(templates, dir.path().join("my data"), dir.path().join("models"));
        let (sink, _, _) = make_sink(OperationKind::Downloading, RunControl::new());
        let dest = dir.path().join("my data").join("live $(echo x).parquet");
        api.download_dataset("live; echo 'hi'", &dest, &sink)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "live; echo 'hi'");
    }

    #[tokio::test]
    async fn json_lines_drive_progress() {
        let dir = tempfile::tempdir().unwrap();
        let templates = CommandTemplates {
            download: Some(
                r#"echo '{"phase":"start","message":"Fetching {dataset}"}'
echo 'plain log line'
echo '{"phase":"progress","progress":50,"current_mb":5,"total_mb":10}'
echo '{"phase":"complete"}'"#
                    .into(),
            ),
            ..CommandTemplates::default()
        };
        let api = backend(dir.path(), templates);
        let (sink, progress, events) = make_sink(OperationKind::Downloading, RunControl::new());
        let dest = dir.path().join("data").join("train.parquet");
        api.download_dataset("train", &dest, &sink).await.unwrap();
        assert!(progress.current().is_idle());
        assert_eq!(events.count_level(EventLevel::Success), 1);
        assert!(dir.path().join("data").is_dir());
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let templates = CommandTemplates {
            train: Some("echo 'disk quota exceeded' >&2; exit 3".into()),
            ..CommandTemplates::default()
        };
        let pipeline = backend(dir.path(), templates);
        let (sink, _, _) = make_sink(OperationKind::Training, RunControl::new());
        let err = pipeline
            .train(&dir.path().join("data"), &dir.path().join("models"), &sink)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disk quota exceeded"));
    }

    #[tokio::test]
    async fn missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let api = backend(dir.path(), CommandTemplates::default());
        let (sink, _, _) = make_sink(OperationKind::Uploading, RunControl::new());
        let err = api
            .upload_predictions(&dir.path().join("p.csv"), &sink)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no `upload` command configured"));
    }

    #[tokio::test]
    async fn stop_kills_running_command() {
        let dir = tempfile::tempdir().unwrap();
        let templates = CommandTemplates {
            train: Some("sleep 10".into()),
            ..CommandTemplates::default()
        };
        let pipeline = backend(dir.path(), templates);
        let control = RunControl::new();
        let (sink, _, _) = make_sink(OperationKind::Training, control.clone());
        let stopper = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            stopper.stop();
        });
        let started = std::time::Instant::now();
        let err = pipeline
            .train(&dir.path().join("data"), &dir.path().join("models"), &sink)
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            err.downcast_ref::<OperationError>(),
            Some(OperationError::Cancelled)
        ));
    }
}
