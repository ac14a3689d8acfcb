//! File system seam.
//!
//! The file store, the thumbnail resolver and export folder synchronisation
//! all reach the disk through [`FileSystemAccess`]. `bridge-desktop` provides
//! the tokio-backed implementation.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// What the core needs to know about a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Length in bytes; 0 for directories
    pub size: u64,
    /// Unix seconds, when the platform reports it
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// Asynchronous file operations.
///
/// Errors for paths that do not exist should satisfy
/// [`BridgeError::is_not_found`](crate::error::BridgeError::is_not_found);
/// callers rely on that to tell "absent" from "broken".
///
/// ```ignore
/// async fn has_same_size(fs: &dyn FileSystemAccess, a: &Path, b: &Path) -> Result<bool> {
///     Ok(fs.metadata(a).await?.size == fs.metadata(b).await?.size)
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Home directory of the current user
    async fn get_home_directory(&self) -> Result<PathBuf>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create `path` and any missing parents
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write `data` to `path`, replacing it and creating missing parents
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Copy contents, permissions and modification time; returns bytes copied
    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64>;

    /// Grant the owner read and write access
    async fn set_read_write(&self, path: &Path) -> Result<()>;

    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Immediate children of a directory, in no particular order
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// `false` for missing paths and plain files
    async fn is_directory(&self, path: &Path) -> Result<bool> {
        if !self.exists(path).await? {
            return Ok(false);
        }
        Ok(self.metadata(path).await?.is_directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use mockall::mock;

    mock! {
        pub Fs {}

        #[async_trait]
        impl FileSystemAccess for Fs {
            async fn get_home_directory(&self) -> Result<PathBuf>;
            async fn exists(&self, path: &Path) -> Result<bool>;
            async fn metadata(&self, path: &Path) -> Result<FileMetadata>;
            async fn create_dir_all(&self, path: &Path) -> Result<()>;
            async fn read_file(&self, path: &Path) -> Result<Bytes>;
            async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;
            async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64>;
            async fn set_read_write(&self, path: &Path) -> Result<()>;
            async fn delete_file(&self, path: &Path) -> Result<()>;
            async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
        }
    }

    fn meta(is_directory: bool) -> FileMetadata {
        FileMetadata {
            size: if is_directory { 0 } else { 10 },
            modified_at: None,
            is_directory,
        }
    }

    #[tokio::test]
    async fn test_is_directory_skips_metadata_for_missing_path() {
        let mut fs = MockFs::new();
        fs.expect_exists().returning(|_| Ok(false));
        fs.expect_metadata().never();

        assert!(!fs.is_directory(Path::new("/exports/gone")).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_directory_follows_metadata() {
        let mut fs = MockFs::new();
        fs.expect_exists().returning(|_| Ok(true));
        fs.expect_metadata()
            .returning(|path| Ok(meta(path == Path::new("/exports"))));

        assert!(fs.is_directory(Path::new("/exports")).await.unwrap());
        assert!(!fs.is_directory(Path::new("/exports/a.jpg")).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_directory_propagates_errors() {
        let mut fs = MockFs::new();
        fs.expect_exists()
            .returning(|_| Err(BridgeError::OperationFailed("device unplugged".into())));

        assert!(fs.is_directory(Path::new("/mnt/usb")).await.is_err());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(BridgeError::PathNotFound(PathBuf::from("/x")).is_not_found());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(BridgeError::Io(io).is_not_found());
        assert!(!BridgeError::OperationFailed("disk full".into()).is_not_found());
    }
}
