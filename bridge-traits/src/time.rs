//! Clock and log sink seams.
//!
//! Export folders are scheduled in whole Unix seconds, so the clock is the
//! only source of "now" the core consults. Hosts substitute a fixed clock in
//! tests and their own journal behind [`LoggerSink`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;

/// Source of the current time.
///
/// ```ignore
/// use bridge_traits::time::Clock;
///
/// fn seconds_until_due(clock: &dyn Clock, last_checked: i64, period: i64) -> i64 {
///     (last_checked + period - clock.unix_timestamp()).max(0)
/// }
/// ```
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Whole seconds since the Unix epoch
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Severity of a forwarded log record, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive name understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record handed to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module that emitted the record, e.g. `core_sync::export_sync`
    pub target: String,
    pub message: String,
    /// Structured fields, already formatted as text
    pub fields: HashMap<String, String>,
    /// Name of the innermost span the record was emitted in
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn in_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }
}

/// Host side of the core's logging.
///
/// Field values may contain paths into the user's library; see
/// `core_runtime::logging::LoggingConfig::with_stripped_paths`.
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Records below this level are dropped before they are built
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_seconds() {
        let clock = SystemClock;
        let before = Utc::now().timestamp();
        let seconds = clock.unix_timestamp();
        assert!(seconds >= before);
        assert!(seconds - before <= 1);
    }

    #[test]
    fn test_log_entry() {
        let entry = LogEntry::new(LogLevel::Warn, "core_sync", "Could not delete stale export file")
            .with_field("filename", "stale.jpg")
            .in_span("do_work");

        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.fields.get("filename").map(String::as_str), Some("stale.jpg"));
        assert_eq!(entry.span.as_deref(), Some("do_work"));
    }

    #[test]
    fn test_log_level_order_and_names() {
        assert!(LogLevel::Trace < LogLevel::Info);
        assert!(LogLevel::Error > LogLevel::Warn);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(serde_json::to_string(&LogLevel::Error).unwrap(), "\"error\"");
    }
}
