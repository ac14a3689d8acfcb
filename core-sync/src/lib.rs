//! # Export Folder Synchronisation
//!
//! Keeps user-chosen directories filled with the results of saved searches.
//!
//! ## Overview
//!
//! This crate manages:
//! - The export phrase mini-language that names exported files
//! - Export folder configuration and its versioned on-disk record
//! - Persisting export folders between runs
//! - Running due folders: copy new files, prune stale ones in
//!   `Synchronise` mode, honour the pause signal

pub mod error;
pub mod export_folder;
pub mod export_phrase;
pub mod export_sync;
pub mod repository;

pub use error::{Result, SyncError};
pub use export_folder::{
    ExportFolder, ExportFolderRecord, ExportFolderSettings, ExportType, SerialisableObject,
};
pub use export_phrase::{
    parse_export_phrase, render_export_filename, sanitize_filename, ExportTerm, FilenameRules,
};
pub use export_sync::{ExportFolderSync, ExportOutcome, ExportStats, DEFAULT_EXPORT_DIR_NAME};
pub use repository::{ExportFolderRepository, JsonExportFolderRepository};
