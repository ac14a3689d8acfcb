//! Thumbnail Resolution - Locate, Regenerate, and Rescale Thumbnails
//!
//! Every stored file has up to two thumbnails: a full-size one rendered from
//! the original file and a scaled one rendered from the full-size one. Both
//! are derived data, so a missing or unreadable thumbnail is rebuilt on
//! demand instead of being reported as lost.
//!
//! ## Overview
//!
//! `ThumbnailResolver::thumbnail_path` returns a path that exists:
//! - Full-size: rendered from the original file when missing
//! - Scaled: rendered from the full-size thumbnail when missing. If that
//!   render fails the full-size thumbnail is treated as corrupt, deleted,
//!   rebuilt from the original and the render is retried once.
//!
//! When the configured dimensions equal [`ThumbnailDimensions::UNSCALED`]
//! there is a single tier and scaled requests are served the full-size path.
//!
//! Regeneration is announced on the event bus, since a thumbnail vanishing
//! usually means something happened to the disk.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::thumbnail::ThumbnailResolver;
//!
//! let resolver = ThumbnailResolver::from_config(&config, file_store, generator)
//!     .with_event_bus(event_bus.clone());
//!
//! let path = resolver.thumbnail_path(&hash, false).await?;
//! ```

use crate::codec::ThumbnailGenerator;
use crate::error::{MetadataError, Result};
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use core_library::{ContentHash, FileLocator, PathScheme};
use core_runtime::config::{CoreConfig, ThumbnailDimensions};
use core_runtime::events::{CoreEvent, EventBus, ThumbnailEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Steps of the scaled thumbnail pipeline.
///
/// `RegenerateFullSize` can be entered once per request; a render failure
/// after it is final.
enum ScaleStep {
    ScaleDown { full_size: PathBuf, retried: bool },
    DiscardFullSize { full_size: PathBuf, reason: String },
    RegenerateFullSize,
    Write(Bytes),
}

/// Resolves and repairs thumbnails.
pub struct ThumbnailResolver {
    scheme: PathScheme,
    locator: Arc<dyn FileLocator>,
    fs: Arc<dyn FileSystemAccess>,
    generator: Arc<dyn ThumbnailGenerator>,
    dimensions: ThumbnailDimensions,
    event_bus: Option<EventBus>,
}

impl ThumbnailResolver {
    pub fn new(
        scheme: PathScheme,
        locator: Arc<dyn FileLocator>,
        fs: Arc<dyn FileSystemAccess>,
        generator: Arc<dyn ThumbnailGenerator>,
        dimensions: ThumbnailDimensions,
    ) -> Self {
        Self {
            scheme,
            locator,
            fs,
            generator,
            dimensions,
            event_bus: None,
        }
    }

    /// Build a resolver over the configured store directories.
    pub fn from_config(
        config: &CoreConfig,
        locator: Arc<dyn FileLocator>,
        generator: Arc<dyn ThumbnailGenerator>,
    ) -> Self {
        let scheme = PathScheme::new(
            config.files_dir.clone(),
            config.thumbnails_dir.clone(),
            config.updates_dir.clone(),
        );
        Self::new(
            scheme,
            locator,
            Arc::clone(&config.file_system),
            generator,
            config.thumbnail_dimensions,
        )
    }

    /// Publish regeneration notices on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Path of an existing thumbnail for `hash`, regenerating it if needed.
    ///
    /// # Errors
    ///
    /// `MetadataError::NotFound` when the thumbnail cannot be produced,
    /// either because the original file is gone or because regeneration
    /// failed. The message carries the diagnostic.
    #[instrument(skip(self), fields(hash = %hash))]
    pub async fn thumbnail_path(&self, hash: &ContentHash, full_size: bool) -> Result<PathBuf> {
        if full_size || self.dimensions.is_unscaled() {
            self.full_size_path(hash).await
        } else {
            self.scaled_path(hash).await
        }
    }

    async fn full_size_path(&self, hash: &ContentHash) -> Result<PathBuf> {
        let path = self.scheme.thumbnail_path_for(hash, true);

        if self.fs.exists(&path).await? {
            return Ok(path);
        }

        self.regenerate_full_size(hash, &path)
            .await
            .map_err(|e| self.report(e))?;

        Ok(path)
    }

    async fn regenerate_full_size(&self, hash: &ContentHash, path: &Path) -> Result<()> {
        let source = match self.locator.file_path(hash, None).await {
            Ok(source) => source,
            Err(e) if e.is_not_found() => {
                return Err(MetadataError::NotFound {
                    hash: hash.to_hex(),
                    message: "the thumbnail was missing and could not be regenerated because \
                              the original file is also missing; check that the storage \
                              drive is connected and healthy"
                        .to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let thumbnail = self
            .generator
            .generate(&source, None)
            .await
            .map_err(|e| self.regeneration_error(hash, path, e.to_string()))?;

        self.fs
            .write_file(path, thumbnail)
            .await
            .map_err(|e| self.regeneration_error(hash, path, format!("could not write: {}", e)))?;

        info!(
            hash = %hash,
            "Thumbnail was missing and has been regenerated from the original file; \
             this can indicate disk corruption"
        );
        self.emit(ThumbnailEvent::Regenerated {
            hash: hash.to_hex(),
        });

        Ok(())
    }

    async fn scaled_path(&self, hash: &ContentHash) -> Result<PathBuf> {
        let target = self.scheme.thumbnail_path_for(hash, false);

        if self.fs.exists(&target).await? {
            return Ok(target);
        }

        let mut step = ScaleStep::ScaleDown {
            full_size: self.full_size_path(hash).await?,
            retried: false,
        };

        loop {
            step = match step {
                ScaleStep::ScaleDown { full_size, retried } => {
                    match self.generator.generate(&full_size, Some(self.dimensions)).await {
                        Ok(bytes) => ScaleStep::Write(bytes),
                        Err(e) if !retried => {
                            warn!(hash = %hash, error = %e, "Full-size thumbnail would not render");
                            ScaleStep::DiscardFullSize {
                                full_size,
                                reason: e.to_string(),
                            }
                        }
                        Err(e) => {
                            let err = self.regeneration_error(hash, &target, e.to_string());
                            return Err(self.report(err));
                        }
                    }
                }
                ScaleStep::DiscardFullSize { full_size, reason } => {
                    match self.fs.delete_file(&full_size).await {
                        Ok(()) => ScaleStep::RegenerateFullSize,
                        Err(e) if e.is_not_found() => ScaleStep::RegenerateFullSize,
                        Err(e) => {
                            let err = self.regeneration_error(
                                hash,
                                &full_size,
                                format!(
                                    "the full-size thumbnail would not render ({}) and deleting it \
                                     failed ({}); check write permission on the thumbnail folder",
                                    reason, e
                                ),
                            );
                            return Err(self.report(err));
                        }
                    }
                }
                ScaleStep::RegenerateFullSize => {
                    debug!(hash = %hash, "Rebuilding full-size thumbnail before retrying");
                    ScaleStep::ScaleDown {
                        full_size: self.full_size_path(hash).await?,
                        retried: true,
                    }
                }
                ScaleStep::Write(bytes) => {
                    if let Err(e) = self.fs.write_file(&target, bytes).await {
                        let err =
                            self.regeneration_error(hash, &target, format!("could not write: {}", e));
                        return Err(self.report(err));
                    }
                    return Ok(target);
                }
            };
        }
    }

    fn regeneration_error(&self, hash: &ContentHash, path: &Path, reason: String) -> MetadataError {
        MetadataError::Regeneration {
            hash: hash.to_hex(),
            path: path.to_path_buf(),
            reason,
        }
    }

    /// Tell the user about a failed repair and hand the caller a not-found
    /// error carrying the same diagnostic.
    fn report(&self, err: MetadataError) -> MetadataError {
        match err {
            MetadataError::Regeneration { hash, path, reason } => {
                error!(hash = %hash, path = ?path, reason = %reason, "Thumbnail regeneration failed");
                self.emit(ThumbnailEvent::RegenerationFailed {
                    hash: hash.clone(),
                    path: path.display().to_string(),
                    reason: reason.clone(),
                });
                MetadataError::NotFound {
                    hash,
                    message: format!(
                        "regenerating {} failed: {}; this can indicate disk corruption",
                        path.display(),
                        reason
                    ),
                }
            }
            other => other,
        }
    }

    fn emit(&self, event: ThumbnailEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Thumbnail(event)).ok();
        }
    }
}
