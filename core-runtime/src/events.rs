//! # Core Events
//!
//! Notices published by the thumbnail resolver and export folder sync for
//! whoever is listening (a status bar, a log pane, tests). Publishing never
//! blocks and never fails the operation that published.
//!
//! ```text
//!  ThumbnailResolver ──┐
//!                      ├── emit ──> EventBus ── subscribe ──> host UI
//!  ExportFolderSync  ──┘          (broadcast)
//! ```
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ExportEvent};
//!
//! let bus = EventBus::new(16);
//! let mut status = bus.subscribe();
//!
//! let _ = bus.emit(CoreEvent::Export(ExportEvent::Paused {
//!     folder: "/home/alex/exports/wallpapers".to_string(),
//! }));
//!
//! assert!(status.try_recv().is_ok());
//! ```
//!
//! Subscribers that fall more than the channel capacity behind get
//! [`RecvError::Lagged`] once and then resume with the newest events.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Channel capacity used by [`EventBus::default`].
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Everything published on the bus.
///
/// Serialises as `{"type": "Export", "payload": {"event": "Completed", ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Thumbnail(ThumbnailEvent),
    Export(ExportEvent),
}

impl CoreEvent {
    /// Short status-line text.
    pub fn description(&self) -> &'static str {
        match self {
            CoreEvent::Thumbnail(ThumbnailEvent::Regenerated { .. }) => "Thumbnail regenerated",
            CoreEvent::Thumbnail(ThumbnailEvent::RegenerationFailed { .. }) => {
                "Thumbnail regeneration failed"
            }
            CoreEvent::Export(ExportEvent::Completed { .. }) => "Export folder synchronised",
            CoreEvent::Export(ExportEvent::Paused { .. }) => "Export folder run paused",
            CoreEvent::Export(ExportEvent::DeleteFailed { .. }) => {
                "Could not delete stale export file"
            }
            CoreEvent::Export(ExportEvent::Failed { .. }) => "Export folder run failed",
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Thumbnail(ThumbnailEvent::RegenerationFailed { .. })
            | CoreEvent::Export(ExportEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Export(ExportEvent::DeleteFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Thumbnail(ThumbnailEvent::Regenerated { .. })
            | CoreEvent::Export(ExportEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Export(ExportEvent::Paused { .. }) => EventSeverity::Debug,
        }
    }
}

/// How loudly a host should surface an event, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Thumbnail store notices. `hash` is the lowercase hex content hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ThumbnailEvent {
    /// A missing or unreadable thumbnail was rebuilt from its source file
    Regenerated { hash: String },
    /// Rebuilding failed; the caller was told the thumbnail is not found
    RegenerationFailed {
        hash: String,
        path: String,
        reason: String,
    },
}

/// Export folder notices. `folder` is the folder's name (its path).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ExportEvent {
    /// The run finished and `last_checked` was saved
    Completed {
        folder: String,
        copied: u64,
        deleted: u64,
    },
    /// Background work was paused between batches; nothing was saved
    Paused { folder: String },
    /// A stale file survived a synchronise prune
    DeleteFailed {
        folder: String,
        filename: String,
        reason: String,
    },
    /// The run aborted; nothing was saved
    Failed { folder: String, reason: String },
}

/// Broadcast channel of [`CoreEvent`]s. Clones share the channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` is how many events a slow subscriber may fall behind by
    /// before it starts losing them.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to current subscribers, returning how many there were.
    ///
    /// Fails only when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Receive events published from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
