use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::PAUSE_POLL_MS;
use crate::errors::OperationError;

/// Shared run / pause flags observed by every operation at its checkpoints.
#[derive(Debug, Clone)]
pub struct RunControl {
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl RunControl {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask every task to wind down at its next checkpoint.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Flip the pause flag, returning the new value.
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    /// Block while paused; fail with `Cancelled` once stopped.
    pub async fn checkpoint(&self) -> Result<(), OperationError> {
        loop {
            if !self.is_running() {
                return Err(OperationError::Cancelled);
            }
            if !self.is_paused() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(PAUSE_POLL_MS)).await;
        }
    }

    /// Sleep for `duration` without ignoring pause or shutdown.
    pub async fn sleep(&self, duration: Duration) -> Result<(), OperationError> {
        let step = Duration::from_millis(PAUSE_POLL_MS);
        let mut remaining = duration;
        while !remaining.is_zero() {
            self.checkpoint().await?;
            let nap = remaining.min(step);
            tokio::time::sleep(nap).await;
            remaining = remaining.saturating_sub(nap);
        }
        self.checkpoint().await
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}
