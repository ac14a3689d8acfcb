//! # Host Capabilities
//!
//! What the media vault core needs from the machine it runs on, as traits a
//! host implements once:
//!
//! - [`FileSystemAccess`] for the file store, thumbnails and export folders
//! - [`PauseSignal`], polled before every export batch
//! - [`Clock`], the only source of "now" for export scheduling
//! - [`LoggerSink`], where structured log records end up
//!
//! Every trait is `Send + Sync` and fails with [`BridgeError`]. A missing path
//! must come back as something [`BridgeError::is_not_found`] recognises; the
//! thumbnail resolver and export sync branch on it.

pub mod background;
pub mod error;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use background::{PauseSignal, SharedPauseFlag};
pub use storage::{FileMetadata, FileSystemAccess};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
