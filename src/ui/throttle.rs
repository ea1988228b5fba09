use std::time::{Duration, Instant};

/// Decides when the controller redraws.
///
/// Redraws every `active` interval while an operation runs, every `idle`
/// interval otherwise, and immediately when forced. The force flag is
/// cleared by the render it triggers.
#[derive(Debug)]
pub struct RenderThrottle {
    active: Duration,
    idle: Duration,
    last: Option<Instant>,
    forced: bool,
}

impl RenderThrottle {
    pub fn new(active: Duration, idle: Duration) -> Self {
        Self {
            active,
            idle,
            last: None,
            forced: true,
        }
    }

    pub fn force(&mut self) {
        self.forced = true;
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn interval(&self, operation_active: bool) -> Duration {
        if operation_active {
            self.active
        } else {
            self.idle
        }
    }

    pub fn is_due(&self, now: Instant, operation_active: bool) -> bool {
        if self.forced {
            return true;
        }
        match self.last {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval(operation_active),
        }
    }

    /// Record a render at `now`.
    pub fn rendered(&mut self, now: Instant) {
        self.last = Some(now);
        self.forced = false;
    }
}
