use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::models::{Event, EventLevel};

use super::lock;

/// Bounded, append-only feed of dashboard events.
///
/// Oldest entries are evicted once `capacity` is reached. Every append is
/// mirrored to `tracing` under the `events` target.
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<Mutex<VecDeque<Event>>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn append(&self, level: EventLevel, message: impl Into<String>) {
        let event = Event::new(level, message);
        match level {
            EventLevel::Info | EventLevel::Success => {
                tracing::info!(target: "events", kind = %level, "{}", event.message)
            }
            EventLevel::Warning => tracing::warn!(target: "events", "{}", event.message),
            EventLevel::Error => tracing::error!(target: "events", "{}", event.message),
        }

        let mut events = lock(&self.inner);
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(EventLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.append(EventLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.append(EventLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.append(EventLevel::Error, message);
    }

    /// Up to the last `n` events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Event> {
        let events = lock(&self.inner);
        let skip = events.len().saturating_sub(n);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Count of retained events at `level`.
    #[cfg(test)]
    pub fn count_level(&self, level: EventLevel) -> usize {
        lock(&self.inner).iter().filter(|e| e.level == level).count()
    }
}
