use std::sync::Mutex;

use crate::errors::OperationError;
use crate::models::{OperationKind, Phase, ProgressFields};
use crate::state::{DownloadTracker, EventLog, ProgressState};
use crate::utils::capitalize;

use super::RunControl;

/// How far a collaborator got in reporting its operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Pending,
    Started,
    Completed,
    Failed(String),
}

/// Progress callback handed to a collaborator for one operation.
///
/// `report` only ever calls the `ProgressState` transitions for the bound
/// operation kind; a collaborator cannot touch any other state.
pub struct ProgressSink {
    kind: OperationKind,
    subject: Option<String>,
    progress: ProgressState,
    events: EventLog,
    control: RunControl,
    dataset: Option<DownloadTracker>,
    outcome: Mutex<Outcome>,
}

impl ProgressSink {
    pub fn new(
        kind: OperationKind,
        subject: Option<String>,
        progress: ProgressState,
        events: EventLog,
        control: RunControl,
    ) -> Self {
        Self {
            kind,
            subject,
            progress,
            events,
            control,
            dataset: None,
            outcome: Mutex::new(Outcome::Pending),
        }
    }

    /// Bind a dataset download: completion moves `subject` to completed in
    /// `tracker` at the moment the collaborator reports it.
    pub fn with_tracker(mut self, tracker: DownloadTracker) -> Self {
        self.dataset = Some(tracker);
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Pause / shutdown checkpoint. Collaborators call this between steps.
    pub async fn checkpoint(&self) -> Result<(), OperationError> {
        self.control.checkpoint().await
    }

    /// True once shutdown was requested. Non-blocking, unlike `checkpoint`.
    pub fn is_cancelled(&self) -> bool {
        !self.control.is_running()
    }

    /// Apply one progress callback. Fields the report omits stay unset.
    pub fn report(&self, phase: Phase, fields: ProgressFields) {
        match phase {
            Phase::Start => self.on_start(&fields),
            Phase::Progress => self.on_progress(&fields),
            Phase::Complete => self.on_complete(&fields),
            Phase::Error => {
                let reason = fields
                    .error
                    .or(fields.message)
                    .unwrap_or_else(|| "unknown error".to_string());
                self.on_error(&reason);
            }
        }
    }

    pub fn start(&self) {
        self.report(Phase::Start, ProgressFields::default());
    }

    pub fn update(&self, fields: ProgressFields) {
        self.report(Phase::Progress, fields);
    }

    pub fn complete(&self) {
        self.report(Phase::Complete, ProgressFields::default());
    }

    pub fn error(&self, reason: impl Into<String>) {
        self.report(Phase::Error, ProgressFields::error(reason));
    }

    pub(crate) fn outcome(&self) -> Outcome {
        self.outcome
            .lock()
            .map(|o| o.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    fn set_outcome(&self, outcome: Outcome) {
        match self.outcome.lock() {
            Ok(mut o) => *o = outcome,
            Err(e) => *e.into_inner() = outcome,
        }
    }

    fn on_start(&self, fields: &ProgressFields) {
        let description = fields
            .message
            .clone()
            .unwrap_or_else(|| self.default_description());
        match self.progress.begin(self.kind, &description) {
            Ok(()) => {
                self.set_outcome(Outcome::Started);
                if fields.progress.is_some() || !fields.details.is_empty() {
                    self.on_progress(fields);
                }
            }
            Err(e) => tracing::warn!(kind = %self.kind, error = %e, "start report rejected"),
        }
    }

    fn on_progress(&self, fields: &ProgressFields) {
        if self.outcome() == Outcome::Pending {
            // Collaborator skipped `start`; open the operation implicitly.
            self.on_start(&ProgressFields::default());
        }
        if let Err(e) = self.progress.update(
            self.kind,
            fields.progress,
            fields.message.as_deref(),
            Some(&fields.details),
        ) {
            tracing::debug!(kind = %self.kind, error = %e, "progress report dropped");
        }
    }

    fn on_complete(&self, fields: &ProgressFields) {
        if self.outcome() == Outcome::Pending {
            self.on_start(&ProgressFields::default());
        }
        match self.progress.complete(self.kind) {
            Ok(finished) => {
                if let (Some(tracker), Some(name)) = (&self.dataset, &self.subject) {
                    tracker.finish(name);
                }
                let message = fields
                    .message
                    .clone()
                    .unwrap_or_else(|| self.default_success());
                tracing::info!(
                    kind = %self.kind,
                    elapsed_ms = finished.elapsed().as_millis() as u64,
                    "operation complete"
                );
                self.events.success(message);
                self.set_outcome(Outcome::Completed);
            }
            Err(e) => tracing::warn!(kind = %self.kind, error = %e, "complete report rejected"),
        }
    }

    fn on_error(&self, reason: &str) {
        if let Err(e) = self.progress.fail(self.kind, reason) {
            tracing::warn!(kind = %self.kind, error = %e, "error report rejected");
        }
        self.set_outcome(Outcome::Failed(reason.to_string()));
    }

    fn default_description(&self) -> String {
        match &self.subject {
            Some(s) => format!("{} {}", self.kind.label(), s),
            None => self.kind.label().to_string(),
        }
    }

    fn default_success(&self) -> String {
        let noun = capitalize(self.kind.noun());
        match &self.subject {
            Some(s) => format!("{} complete: {}", noun, s),
            None => format!("{} complete", noun),
        }
    }
}
