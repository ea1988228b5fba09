//! Shared mutable dashboard state.
//!
//! `ProgressState`, `EventLog`, and `DownloadTracker` are the only values
//! touched from more than one task. Each is a cheap-to-clone handle around
//! an `Arc<Mutex<_>>`; every mutation goes through its methods.

mod downloads;
mod event_log;
mod progress;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use downloads::{DatasetState, DownloadStatus, DownloadTracker};
pub use event_log::EventLog;
pub use progress::{ProgressSnapshot, ProgressState};

/// Lock a mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
