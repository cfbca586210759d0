use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub message: String,
    pub level: Level,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }
}

/// Receiver of the ordered progress stream of one scan. The scanner is the
/// only producer and never reads back what it emitted.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

impl ProgressSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

impl ProgressSink for tokio::sync::mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        // receiver gone means nobody is watching anymore
        let _ = self.send(event);
    }
}

/// Discards every event.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&mut self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_keeps_order() {
        let mut sink: Vec<ProgressEvent> = Vec::new();
        sink.emit(ProgressEvent::info("first"));
        sink.emit(ProgressEvent::error("second"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].message, "first");
        assert_eq!(sink[1].level, Level::Error);
        assert!(sink[0].timestamp <= sink[1].timestamp);
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (mut tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        tx.emit(ProgressEvent::success("nobody listens"));
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let json = serde_json::to_string(&Level::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
