//! Installs the global subscriber and checks what reaches the host sink.

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Journal {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for Journal {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// The global subscriber can be installed once per process.
#[test]
fn test_installed_subscriber_feeds_host_journal() {
    let journal = Arc::new(Journal::default());
    let sink: Arc<dyn LoggerSink> = journal.clone();

    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_stripped_paths(true)
        .with_logger_sink(sink);

    init_logging(config.clone()).unwrap();
    assert!(init_logging(config).is_err());

    let span = tracing::info_span!(target: "core_sync", "do_work");
    span.in_scope(|| {
        tracing::info!(
            target: "core_sync",
            folder = "/home/alex/exports/wallpapers",
            copied = 3u64,
            "Export folder synchronised"
        );
    });
    tracing::warn!(
        target: "core_metadata",
        path = "C:\\vault\\client_thumbnails\\ab\\ab12",
        "Regenerating thumbnail"
    );
    tracing::trace!(target: "core_sync", "below the journal's level");
    tracing::info!(target: "hyper", "outside the workspace filter");

    let entries = journal.entries.lock().unwrap();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].message, "Export folder synchronised");
    assert_eq!(entries[0].fields.get("folder").map(String::as_str), Some("wallpapers"));
    assert_eq!(entries[0].fields.get("copied").map(String::as_str), Some("3"));
    assert_eq!(entries[0].span.as_deref(), Some("do_work"));

    assert_eq!(entries[1].level, LogLevel::Warn);
    assert_eq!(entries[1].fields.get("path").map(String::as_str), Some("ab12"));
    assert!(entries[1].span.is_none());
}
