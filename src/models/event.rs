use std::fmt;

use chrono::{DateTime, Local};

/// Severity of a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl EventLevel {
    /// Single-glyph marker shown in the event panel.
    pub fn icon(&self) -> &'static str {
        match self {
            EventLevel::Info => "·",
            EventLevel::Success => "✓",
            EventLevel::Warning => "!",
            EventLevel::Error => "✗",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLevel::Info => write!(f, "INFO"),
            EventLevel::Success => write!(f, "OK"),
            EventLevel::Warning => write!(f, "WARN"),
            EventLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A single immutable entry in the event feed.
#[derive(Debug, Clone)]
pub struct Event {
    pub timestamp: DateTime<Local>,
    pub level: EventLevel,
    pub message: String,
}

impl Event {
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }

    /// `HH:MM:SS` for the feed.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}
