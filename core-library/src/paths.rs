//! Deterministic on-disk layout
//!
//! ```text
//! <files>/<2hex>/<hash><ext>
//! <thumbnails>/<2hex>/<hash>            full-size thumbnail
//! <thumbnails>/<2hex>/<hash>_resized    scaled thumbnail
//! <updates>/<hex(service)>/<begin>_<subindex>.json
//! <updates>/<hex(service)>/<begin>_metadata.json
//! ```
//!
//! The two hex character shard keeps any single directory at roughly 1/256th
//! of the store.

use crate::models::{ContentHash, Mime, ServiceKey};
use std::path::{Path, PathBuf};

/// Suffix distinguishing scaled thumbnails from full-size ones.
pub const RESIZED_SUFFIX: &str = "_resized";

/// Every shard directory name, `00` through `ff`.
pub fn shard_prefixes() -> impl Iterator<Item = String> {
    (0..=u8::MAX).map(|byte| format!("{:02x}", byte))
}

/// Pure mapping from content hashes to storage locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathScheme {
    files_root: PathBuf,
    thumbnails_root: PathBuf,
    updates_root: PathBuf,
}

impl PathScheme {
    pub fn new(
        files_root: impl Into<PathBuf>,
        thumbnails_root: impl Into<PathBuf>,
        updates_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            files_root: files_root.into(),
            thumbnails_root: thumbnails_root.into(),
            updates_root: updates_root.into(),
        }
    }

    pub fn files_root(&self) -> &Path {
        &self.files_root
    }

    pub fn thumbnails_root(&self) -> &Path {
        &self.thumbnails_root
    }

    pub fn updates_root(&self) -> &Path {
        &self.updates_root
    }

    /// Shard directory holding the original file.
    pub fn storage_dir_for(&self, hash: &ContentHash) -> PathBuf {
        self.files_root.join(hash.shard_prefix())
    }

    /// Where the original file lives once its type is known.
    pub fn file_path_for(&self, hash: &ContentHash, mime: Mime) -> PathBuf {
        Self::expected_file_path(&self.files_root, hash, mime)
    }

    /// Layout rule shared by every file root.
    pub fn expected_file_path(root: &Path, hash: &ContentHash, mime: Mime) -> PathBuf {
        root.join(hash.shard_prefix())
            .join(format!("{}{}", hash.to_hex(), mime.extension()))
    }

    pub fn thumbnail_dir_for(&self, hash: &ContentHash) -> PathBuf {
        self.thumbnails_root.join(hash.shard_prefix())
    }

    pub fn thumbnail_path_for(&self, hash: &ContentHash, full_size: bool) -> PathBuf {
        let mut name = hash.to_hex();
        if !full_size {
            name.push_str(RESIZED_SUFFIX);
        }
        self.thumbnail_dir_for(hash).join(name)
    }

    pub fn update_dir(&self, service_key: &ServiceKey) -> PathBuf {
        self.updates_root.join(service_key.to_hex())
    }

    pub fn content_update_package_path(
        &self,
        service_key: &ServiceKey,
        begin: i64,
        subindex: u32,
    ) -> PathBuf {
        self.update_dir(service_key)
            .join(format!("{}_{}.json", begin, subindex))
    }

    pub fn service_update_package_path(&self, service_key: &ServiceKey, begin: i64) -> PathBuf {
        self.update_dir(service_key)
            .join(format!("{}_metadata.json", begin))
    }
}
