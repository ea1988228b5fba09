//! Error taxonomy.
//!
//! Operation errors are recovered locally (turned into feed events);
//! only terminal initialization failures escape the controller.

use std::io;

use thiserror::Error;

use crate::models::OperationKind;

/// Failures of the operation state machine and runner.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OperationError {
    #[error("{active} is already active")]
    AlreadyActive { active: OperationKind },

    #[error("{got} update rejected: current operation is {current}")]
    WrongOperation {
        current: OperationKind,
        got: OperationKind,
    },

    #[error("cannot start {requested}: {active} in progress")]
    OperationInProgress {
        requested: String,
        active: OperationKind,
    },

    #[error("{kind} failed: {reason}")]
    CollaboratorFailure { kind: OperationKind, reason: String },

    #[error("cancelled")]
    Cancelled,
}

/// System polling failure. The previous snapshot stays on screen.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot unavailable: {0}")]
    Unavailable(String),
}

/// Terminal driver failures.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// Raw key mode could not be enabled; the dashboard keeps rendering
    /// without keyboard input.
    #[error("raw keyboard mode unavailable: {0}")]
    Unavailable(#[source] io::Error),

    /// The terminal could not be acquired at all.
    #[error("cannot initialize terminal: {0}")]
    FatalInit(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        let e = OperationError::OperationInProgress {
            requested: "download".into(),
            active: OperationKind::Training,
        };
        assert_eq!(e.to_string(), "cannot start download: Training in progress");

        let e = OperationError::CollaboratorFailure {
            kind: OperationKind::Downloading,
            reason: "network timeout".into(),
        };
        assert!(e.to_string().contains("network timeout"));
    }

    #[test]
    fn terminal_error_keeps_source() {
        let e = TerminalError::FatalInit(io::Error::new(io::ErrorKind::Other, "no tty"));
        assert!(std::error::Error::source(&e).is_some());
        assert!(e.to_string().contains("no tty"));
    }
}
