//! Append-only operation log shown to the user and exportable as JSON.
//!
//! Entries are kept newest first and never evicted. Every entry is mirrored to
//! `tracing` at the matching level so the rolling log file carries the same
//! history as the in-memory view.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Millisecond timestamp, bumped when two entries land in the same millisecond.
    pub id: u64,
    pub message: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
}

/// Document written by [`ActivityLog::export`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogExport {
    pub exported_at: DateTime<Utc>,
    pub total_logs: usize,
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Default, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    last_id: u64,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) -> &LogEntry {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!(kind = level.as_str(), "{message}"),
            LogLevel::Success => tracing::info!(kind = level.as_str(), "{message}"),
            LogLevel::Warning => tracing::warn!(kind = level.as_str(), "{message}"),
            LogLevel::Error => tracing::error!(kind = level.as_str(), "{message}"),
        }

        let timestamp = Utc::now();
        let millis = u64::try_from(timestamp.timestamp_millis()).unwrap_or_default();
        let id = millis.max(self.last_id + 1);
        self.last_id = id;

        self.entries.push_front(LogEntry {
            id,
            message,
            level,
            timestamp,
        });
        &self.entries[0]
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    /// Per-level totals, only for levels that occur.
    pub fn counts(&self) -> BTreeMap<LogLevel, usize> {
        let mut out = BTreeMap::new();
        for e in &self.entries {
            *out.entry(e.level).or_insert(0) += 1;
        }
        out
    }

    pub fn export(&self) -> LogExport {
        LogExport {
            exported_at: Utc::now(),
            total_logs: self.entries.len(),
            logs: self.entries.iter().cloned().collect(),
        }
    }
}
