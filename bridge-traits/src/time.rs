//! Clock and logging seams shared with the host.
//!
//! The catalog core never reads system time or writes to a platform logger
//! directly. A [`Clock`] is injected wherever wall time feeds a decision,
//! most notably playback-status cache expiry, and a [`LoggerSink`] carries
//! structured runtime output into whatever pipeline the host already owns.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Source of wall-clock time.
///
/// Injected so cache TTLs and sync bookkeeping can be tested with a
/// hand-wound clock instead of real delays.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by real system time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Severity of a [`LogEntry`].
///
/// Ordered from most to least verbose so sinks can threshold with a plain
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One structured log record handed across to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Time the record was produced, not delivered.
    pub timestamp: DateTime<Utc>,
    /// Module path that emitted the record.
    pub target: String,
    pub message: String,
    /// Key-value context captured alongside the message.
    pub fields: HashMap<String, String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
        }
    }
}

/// Destination for runtime log output on the host side.
///
/// The runtime installs a `tracing` layer that converts events into
/// [`LogEntry`] values and delivers them here. Entries below the sink's
/// minimum level are dropped before delivery, so implementations only see
/// records they asked for.
///
/// Implementations must not log account identifiers or server credentials.
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    /// Deliver one entry to the host pipeline.
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Threshold below which the caller discards entries.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_tracks_real_time() {
        let clock = SystemClock;
        assert!(clock.now().timestamp() > 1_600_000_000);
    }

    #[test]
    fn test_level_ordering_supports_thresholds() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_entry_carries_target_and_fields() {
        let mut entry = LogEntry::new(LogLevel::Warn, "core_sync", "refresh skipped");
        entry.fields.insert("reason".to_string(), "offline".to_string());

        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.target, "core_sync");
        assert_eq!(entry.fields.get("reason"), Some(&"offline".to_string()));
        assert!(entry.timestamp <= Utc::now());
    }
}
