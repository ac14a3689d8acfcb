//! File store access
//!
//! Resolves content hashes to files on disk through [`FileSystemAccess`] and
//! enumerates what the thumbnail store holds.

use crate::error::{LibraryError, Result};
use crate::models::{ContentHash, Mime};
use crate::paths::{shard_prefixes, PathScheme, RESIZED_SUFFIX};
use async_trait::async_trait;
use bridge_traits::storage::FileSystemAccess;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Locates the original file for a content hash.
#[async_trait]
pub trait FileLocator: Send + Sync {
    /// Path of the stored file.
    ///
    /// With `mime` unknown every accepted type is probed in
    /// [`Mime::ALLOWED`] order.
    ///
    /// # Errors
    ///
    /// `LibraryError::NotFound` when no candidate exists on disk.
    async fn file_path(&self, hash: &ContentHash, mime: Option<Mime>) -> Result<PathBuf>;
}

/// Content-addressed file store rooted at a [`PathScheme`].
pub struct FileStore {
    scheme: PathScheme,
    fs: Arc<dyn FileSystemAccess>,
}

impl FileStore {
    pub fn new(scheme: PathScheme, fs: Arc<dyn FileSystemAccess>) -> Self {
        Self { scheme, fs }
    }

    pub fn scheme(&self) -> &PathScheme {
        &self.scheme
    }

    /// Resolve a hash under an arbitrary file root.
    pub async fn resolve_storage_path(
        &self,
        root: &Path,
        hash: &ContentHash,
        mime: Option<Mime>,
    ) -> Result<PathBuf> {
        let candidates: Vec<Mime> = match mime {
            Some(mime) => vec![mime],
            None => Mime::ALLOWED.to_vec(),
        };

        for candidate in candidates {
            let path = PathScheme::expected_file_path(root, hash, candidate);
            if self.fs.exists(&path).await? {
                return Ok(path);
            }
        }

        Err(LibraryError::NotFound {
            hash: hash.to_hex(),
        })
    }

    /// Hashes that have a full-size thumbnail.
    ///
    /// Scaled thumbnails, names that are not a hex digest and missing shard
    /// directories are skipped.
    pub async fn thumbnail_hashes(&self) -> Result<HashSet<ContentHash>> {
        let mut hashes = HashSet::new();

        for prefix in shard_prefixes() {
            let dir = self.scheme.thumbnails_root().join(&prefix);
            let entries = match self.fs.list_directory(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };

            for entry in entries {
                let Some(name) = entry.file_name().and_then(|name| name.to_str()) else {
                    continue;
                };
                if name.ends_with(RESIZED_SUFFIX) {
                    continue;
                }
                match ContentHash::from_hex(name) {
                    Ok(hash) => {
                        hashes.insert(hash);
                    }
                    Err(_) => debug!(path = ?entry, "Skipping unrecognised thumbnail entry"),
                }
            }
        }

        Ok(hashes)
    }

    /// Breadth-first expansion of directories into the files they contain.
    ///
    /// Paths that are not directories are returned as given, so a missing
    /// path passes through for the caller to report.
    pub async fn expand_paths(&self, raw_paths: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
        let mut file_paths = Vec::new();
        let mut to_process = raw_paths;

        while !to_process.is_empty() {
            let mut next = Vec::new();

            for path in to_process {
                if self.fs.is_directory(&path).await? {
                    let mut children = self.fs.list_directory(&path).await?;
                    children.sort();
                    next.extend(children);
                } else {
                    file_paths.push(path);
                }
            }

            to_process = next;
        }

        Ok(file_paths)
    }
}

#[async_trait]
impl FileLocator for FileStore {
    async fn file_path(&self, hash: &ContentHash, mime: Option<Mime>) -> Result<PathBuf> {
        let result = self
            .resolve_storage_path(self.scheme.files_root(), hash, mime)
            .await;
        if let Err(LibraryError::NotFound { .. }) = &result {
            warn!(hash = %hash, ?mime, "File missing from store");
        }
        result
    }
}
