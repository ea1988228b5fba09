use std::fmt;

use serde::Deserialize;

/// The long-running operation currently owning the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationKind {
    #[default]
    Idle,
    Downloading,
    Training,
    Predicting,
    Uploading,
}

impl OperationKind {
    pub fn is_idle(&self) -> bool {
        *self == OperationKind::Idle
    }

    /// Verb used in status lines ("Downloading", "Training", ...).
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Idle => "Idle",
            OperationKind::Downloading => "Downloading",
            OperationKind::Training => "Training",
            OperationKind::Predicting => "Predicting",
            OperationKind::Uploading => "Uploading",
        }
    }

    /// Noun used in event messages ("download complete").
    pub fn noun(&self) -> &'static str {
        match self {
            OperationKind::Idle => "idle",
            OperationKind::Downloading => "download",
            OperationKind::Training => "training",
            OperationKind::Predicting => "prediction",
            OperationKind::Uploading => "upload",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lifecycle tag attached to every progress report from a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Progress,
    Complete,
    Error,
}

/// Operation-specific counters. Every field is optional: a report only
/// overwrites the fields it carries, the rest keep their previous value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Details {
    // download / upload
    pub current_mb: Option<f64>,
    pub total_mb: Option<f64>,
    pub speed_mb_s: Option<f64>,
    pub eta_seconds: Option<f64>,
    // training
    pub epoch: Option<u32>,
    pub total_epochs: Option<u32>,
    pub loss: Option<f64>,
    pub val_score: Option<f64>,
    // prediction
    pub rows_processed: Option<u64>,
    pub total_rows: Option<u64>,
}

impl Details {
    pub fn is_empty(&self) -> bool {
        *self == Details::default()
    }

    /// Overlay the fields present in `other`, leaving absent ones untouched.
    pub fn merge(&mut self, other: &Details) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        overlay!(
            current_mb,
            total_mb,
            speed_mb_s,
            eta_seconds,
            epoch,
            total_epochs,
            loss,
            val_score,
            rows_processed,
            total_rows
        );
    }
}

/// Field map carried by a progress report.
///
/// Collaborators may send any subset. `message` doubles as the new
/// description line; `error` is the failure reason for [`Phase::Error`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgressFields {
    pub name: Option<String>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub error: Option<String>,
    #[serde(flatten)]
    pub details: Details,
}

impl ProgressFields {
    pub fn percent(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }
}
