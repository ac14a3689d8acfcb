//! # Core Configuration Module
//!
//! Provides configuration management for the Media Vault Core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the storage layout, thumbnail and export settings, and
//! the host bridges the core needs. It enforces fail-fast validation so a
//! misconfigured store is rejected before any file is touched.
//!
//! ## Required Settings
//!
//! - `files_dir` - Root of the content-addressed file store
//! - `thumbnails_dir` - Root of the thumbnail store
//! - `updates_dir` - Root of the repository update packages
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `FileSystemAccess` - File I/O (desktop default: tokio fs)
//! - `PauseSignal` - Export folder pause switch (default: `SharedPauseFlag`)
//! - `Clock` - Time source (default: `SystemClock`)
//!
//! When the `desktop-shims` feature is enabled, `TokioFileSystem` is injected
//! automatically if no file system is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, ThumbnailDimensions};
//!
//! let config = CoreConfig::builder()
//!     .files_dir("/vault/client_files")
//!     .thumbnails_dir("/vault/client_thumbnails")
//!     .updates_dir("/vault/client_updates")
//!     .thumbnail_dimensions(ThumbnailDimensions::new(150, 125))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, FileSystemAccess, PauseSignal, SharedPauseFlag, SystemClock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Bounding box for generated thumbnails, in pixels.
///
/// Full-size thumbnails are always generated at [`ThumbnailDimensions::UNSCALED`];
/// when the configured dimensions equal that sentinel the scaled tier is
/// skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThumbnailDimensions {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailDimensions {
    /// Dimensions of the full-size thumbnail tier.
    pub const UNSCALED: ThumbnailDimensions = ThumbnailDimensions {
        width: 200,
        height: 200,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether these dimensions collapse the scaled tier into the full-size one.
    pub fn is_unscaled(&self) -> bool {
        *self == Self::UNSCALED
    }
}

impl Default for ThumbnailDimensions {
    fn default() -> Self {
        Self::UNSCALED
    }
}

/// Export folder synchronisation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Number of media records fetched per query batch
    pub batch_size: usize,

    /// Polling period given to newly created export folders (seconds)
    pub default_period_secs: u64,

    /// Filename phrase given to newly created export folders
    pub default_phrase: String,
}

impl ExportSettings {
    pub const DEFAULT_BATCH_SIZE: usize = 256;
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            batch_size: Self::DEFAULT_BATCH_SIZE,
            default_period_secs: 3600,
            default_phrase: "{hash}".to_string(),
        }
    }
}

/// Core configuration for the Media Vault Core.
///
/// This struct holds all dependencies and settings required to initialize
/// the core library. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root of the content-addressed file store
    pub files_dir: PathBuf,

    /// Root of the thumbnail store
    pub thumbnails_dir: PathBuf,

    /// Root of the repository update packages
    pub updates_dir: PathBuf,

    /// Default destination for manual exports (`None` = `<home>/vault_export`)
    pub export_dir: Option<PathBuf>,

    /// Dimensions of the scaled thumbnail tier
    pub thumbnail_dimensions: ThumbnailDimensions,

    /// Export folder synchronisation settings
    pub export: ExportSettings,

    /// File system access abstraction
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Process-wide pause switch for export folders
    pub pause_signal: Arc<dyn PauseSignal>,

    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("files_dir", &self.files_dir)
            .field("thumbnails_dir", &self.thumbnails_dir)
            .field("updates_dir", &self.updates_dir)
            .field("export_dir", &self.export_dir)
            .field("thumbnail_dimensions", &self.thumbnail_dimensions)
            .field("export", &self.export)
            .field("file_system", &"FileSystemAccess { ... }")
            .field("pause_signal", &"PauseSignal { ... }")
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Store directories are not empty and are distinct
    /// - Thumbnail dimensions are non-zero
    /// - The export batch size and period are non-zero
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("Files directory", &self.files_dir),
            ("Thumbnails directory", &self.thumbnails_dir),
            ("Updates directory", &self.updates_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(Error::Config(format!("{} cannot be empty", name)));
            }
        }

        if self.files_dir == self.thumbnails_dir {
            return Err(Error::Config(
                "Files and thumbnails must live in different directories".to_string(),
            ));
        }

        if self.thumbnail_dimensions.width == 0 || self.thumbnail_dimensions.height == 0 {
            return Err(Error::Config(
                "Thumbnail dimensions must be greater than 0".to_string(),
            ));
        }

        if self.export.batch_size == 0 {
            return Err(Error::Config(
                "Export batch size must be greater than 0".to_string(),
            ));
        }

        if self.export.default_period_secs == 0 {
            return Err(Error::Config(
                "Export folder period must be greater than 0 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for the file store. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioFileSystem. \
                 Other hosts: inject a platform-native implementation."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    files_dir: Option<PathBuf>,
    thumbnails_dir: Option<PathBuf>,
    updates_dir: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    thumbnail_dimensions: Option<ThumbnailDimensions>,
    export: Option<ExportSettings>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    pause_signal: Option<Arc<dyn PauseSignal>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the root of the content-addressed file store.
    pub fn files_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.files_dir = Some(path.into());
        self
    }

    /// Sets the root of the thumbnail store.
    pub fn thumbnails_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.thumbnails_dir = Some(path.into());
        self
    }

    /// Sets the root of the update package store.
    pub fn updates_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.updates_dir = Some(path.into());
        self
    }

    /// Sets the default destination for manual exports.
    ///
    /// Relative paths are resolved against the parent of the files directory,
    /// so a whole vault can be moved without breaking the setting.
    pub fn export_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.export_dir = Some(path.into());
        self
    }

    /// Sets the scaled thumbnail dimensions.
    ///
    /// Default: [`ThumbnailDimensions::UNSCALED`] (a single thumbnail tier)
    pub fn thumbnail_dimensions(mut self, dimensions: ThumbnailDimensions) -> Self {
        self.thumbnail_dimensions = Some(dimensions);
        self
    }

    /// Sets export folder synchronisation settings.
    pub fn export_settings(mut self, settings: ExportSettings) -> Self {
        self.export = Some(settings);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the export folder pause switch.
    pub fn pause_signal(mut self, signal: Arc<dyn PauseSignal>) -> Self {
        self.pause_signal = Some(signal);
        self
    }

    /// Sets the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a required directory is missing, if no
    /// `FileSystemAccess` is available, or if validation fails.
    pub fn build(self) -> Result<CoreConfig> {
        let files_dir = self.files_dir.ok_or_else(|| {
            Error::Config("Files directory is required. Use .files_dir() to set it.".to_string())
        })?;

        let thumbnails_dir = self.thumbnails_dir.ok_or_else(|| {
            Error::Config(
                "Thumbnails directory is required. Use .thumbnails_dir() to set it.".to_string(),
            )
        })?;

        let updates_dir = self.updates_dir.ok_or_else(|| {
            Error::Config(
                "Updates directory is required. Use .updates_dir() to set it.".to_string(),
            )
        })?;

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let export_dir = self.export_dir.map(|dir| {
            if dir.is_relative() {
                files_dir
                    .parent()
                    .map(|base| base.join(&dir))
                    .unwrap_or(dir)
            } else {
                dir
            }
        });

        let config = CoreConfig {
            files_dir,
            thumbnails_dir,
            updates_dir,
            export_dir,
            thumbnail_dimensions: self.thumbnail_dimensions.unwrap_or_default(),
            export: self.export.unwrap_or_default(),
            file_system,
            pause_signal: self
                .pause_signal
                .unwrap_or_else(|| Arc::new(SharedPauseFlag::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}
