use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::errors::OperationError;
use crate::models::{Details, OperationKind};
use crate::utils::capitalize;

use super::{lock, EventLog};

/// Point-in-time copy of the operation slot, safe to hand to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub current: OperationKind,
    pub description: String,
    pub progress_pct: f64,
    pub started_at: Option<Instant>,
    pub details: Details,
}

impl ProgressSnapshot {
    fn idle() -> Self {
        Self {
            current: OperationKind::Idle,
            description: String::new(),
            progress_pct: 0.0,
            started_at: None,
            details: Details::default(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_idle()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// The single active-operation slot.
///
/// At most one operation is non-idle at any instant. All transitions are
/// serialized by one mutex so the renderer always reads a consistent slot.
#[derive(Debug, Clone)]
pub struct ProgressState {
    inner: Arc<Mutex<ProgressSnapshot>>,
    events: EventLog,
}

impl ProgressState {
    pub fn new(events: EventLog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProgressSnapshot::idle())),
            events,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        lock(&self.inner).clone()
    }

    pub fn current(&self) -> OperationKind {
        lock(&self.inner).current
    }

    /// Claim the slot for `kind`. Fails if anything else holds it.
    pub fn begin(&self, kind: OperationKind, description: &str) -> Result<(), OperationError> {
        let mut slot = lock(&self.inner);
        if !slot.current.is_idle() {
            return Err(OperationError::AlreadyActive {
                active: slot.current,
            });
        }
        if kind.is_idle() {
            return Err(OperationError::WrongOperation {
                current: slot.current,
                got: kind,
            });
        }
        *slot = ProgressSnapshot {
            current: kind,
            description: description.to_string(),
            progress_pct: 0.0,
            started_at: Some(Instant::now()),
            details: Details::default(),
        };
        tracing::debug!(%kind, description, "operation started");
        Ok(())
    }

    /// Apply a progress report. Percent is clamped to [0, 100] and never
    /// moves backwards within one operation.
    pub fn update(
        &self,
        kind: OperationKind,
        progress_pct: Option<f64>,
        description: Option<&str>,
        details: Option<&Details>,
    ) -> Result<(), OperationError> {
        let mut slot = lock(&self.inner);
        check_current(&slot, kind)?;
        if let Some(pct) = progress_pct.filter(|p| p.is_finite()) {
            slot.progress_pct = pct.clamp(0.0, 100.0).max(slot.progress_pct);
        }
        if let Some(text) = description {
            slot.description = text.to_string();
        }
        if let Some(d) = details {
            slot.details.merge(d);
        }
        Ok(())
    }

    /// Finish `kind`: percent is set to 100, then the slot is reset.
    /// Returns the final 100% view of the operation.
    pub fn complete(&self, kind: OperationKind) -> Result<ProgressSnapshot, OperationError> {
        let mut slot = lock(&self.inner);
        check_current(&slot, kind)?;
        slot.progress_pct = 100.0;
        let finished = slot.clone();
        *slot = ProgressSnapshot::idle();
        tracing::debug!(%kind, elapsed = ?finished.elapsed(), "operation completed");
        Ok(finished)
    }

    /// Record a failure of `kind` as an error event and reset the slot.
    ///
    /// Also accepted while idle (the collaborator failed before reporting
    /// start) so the failure is never silent.
    pub fn fail(&self, kind: OperationKind, reason: &str) -> Result<(), OperationError> {
        {
            let mut slot = lock(&self.inner);
            if !slot.current.is_idle() {
                check_current(&slot, kind)?;
            }
            *slot = ProgressSnapshot::idle();
        }
        tracing::warn!(%kind, reason, "operation failed");
        self.events
            .error(format!("{} failed: {}", capitalize(kind.noun()), reason));
        Ok(())
    }

    /// Force the slot back to idle.
    pub fn reset(&self) {
        *lock(&self.inner) = ProgressSnapshot::idle();
    }
}

fn check_current(slot: &ProgressSnapshot, kind: OperationKind) -> Result<(), OperationError> {
    if slot.current != kind || kind.is_idle() {
        return Err(OperationError::WrongOperation {
            current: slot.current,
            got: kind,
        });
    }
    Ok(())
}
