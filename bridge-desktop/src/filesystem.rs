//! Desktop [`FileSystemAccess`] on `tokio::fs`.
//!
//! Misses are reported as [`BridgeError::PathNotFound`] so callers can tell a
//! missing thumbnail or export destination from a broken disk.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// File system access for desktop hosts.
///
/// The home directory comes from `dirs` unless overridden, which is where
/// the default export directory is created.
pub struct TokioFileSystem {
    home_dir: Option<PathBuf>,
}

impl TokioFileSystem {
    /// Use the platform home directory
    pub fn new() -> Self {
        Self {
            home_dir: dirs::home_dir(),
        }
    }

    /// Use `home_dir` instead of the platform home directory
    pub fn with_home_directory(home_dir: PathBuf) -> Self {
        Self {
            home_dir: Some(home_dir),
        }
    }

    /// Convert std::io::Error to BridgeError, keeping the path for misses
    fn map_io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BridgeError + '_ {
        move |e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::PathNotFound(path.to_path_buf())
            } else {
                BridgeError::Io(e)
            }
        }
    }

    fn unix_seconds(time: std::io::Result<SystemTime>) -> Option<i64> {
        time.ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
    }

    /// Carry the source's access and modification times over to a copy
    async fn copy_times(source: &Path, destination: &Path) -> std::io::Result<()> {
        let source_meta = fs::metadata(source).await?;
        let mut times = std::fs::FileTimes::new().set_modified(source_meta.modified()?);
        if let Ok(accessed) = source_meta.accessed() {
            times = times.set_accessed(accessed);
        }

        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || {
            // Read-only copies still accept new times from their owner on unix.
            let file = std::fs::File::options()
                .write(true)
                .open(&destination)
                .or_else(|_| std::fs::File::open(&destination))?;
            file.set_times(times)
        })
        .await
        .map_err(std::io::Error::other)?
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_home_directory(&self) -> Result<PathBuf> {
        self.home_dir
            .clone()
            .ok_or_else(|| BridgeError::NotAvailable("home directory".to_string()))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(fs::try_exists(path).await?)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path)
            .await
            .map_err(Self::map_io_error(path))?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: Self::unix_seconds(metadata.modified()),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error(path))?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }

        fs::write(path, data.as_ref()).await?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64> {
        let copied = fs::copy(source, destination)
            .await
            .map_err(Self::map_io_error(source))?;

        if let Err(e) = Self::copy_times(source, destination).await {
            debug!(path = ?destination, error = %e, "Could not carry over file times");
        }

        debug!(source = ?source, destination = ?destination, size = copied, "Copied file");
        Ok(copied)
    }

    async fn set_read_write(&self, path: &Path) -> Result<()> {
        let mut permissions = fs::metadata(path)
            .await
            .map_err(Self::map_io_error(path))?
            .permissions();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            permissions.set_mode(0o600);
        }

        #[cfg(not(unix))]
        permissions.set_readonly(false);

        fs::set_permissions(path, permissions).await?;
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(Self::map_io_error(path))?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await.map_err(Self::map_io_error(path))?;

        while let Some(entry) = read_dir.next_entry().await? {
            entries.push(entry.path());
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_custom_home_directory() {
        let home = std::env::temp_dir().join("vault-home");
        let fs = TokioFileSystem::with_home_directory(home.clone());

        assert_eq!(fs.get_home_directory().await.unwrap(), home);
    }

    #[tokio::test]
    async fn test_write_creates_hash_prefix_directory() {
        let dir = tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let thumbnail = dir.path().join("client_thumbnails").join("ab").join("ab12");

        fs.write_file(&thumbnail, Bytes::from_static(b"\x89PNG")).await.unwrap();

        assert_eq!(fs.read_file(&thumbnail).await.unwrap(), Bytes::from_static(b"\x89PNG"));
        assert!(fs.is_directory(thumbnail.parent().unwrap()).await.unwrap());
        assert!(!fs.is_directory(&thumbnail).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_maps_to_path_not_found() {
        let dir = tempdir().unwrap();
        let fs = TokioFileSystem::new();

        let err = fs.metadata(&dir.path().join("nope")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!fs.exists(&dir.path().join("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_preserves_modified_time() {
        let dir = tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let source = dir.path().join("source.jpg");
        let destination = dir.path().join("dest.jpg");

        fs.write_file(&source, Bytes::from_static(b"jpeg bytes")).await.unwrap();
        let old = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        std::fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let copied = fs.copy_file(&source, &destination).await.unwrap();
        assert_eq!(copied, 10);

        let meta = fs.metadata(&destination).await.unwrap();
        assert_eq!(meta.size, 10);
        assert_eq!(meta.modified_at, Some(1_000_000));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_set_read_write_clears_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let path = dir.path().join("locked.png");
        fs.write_file(&path, Bytes::from_static(b"png")).await.unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o400)).unwrap();

        fs.set_read_write(&path).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let dir = tempdir().unwrap();
        let fs = TokioFileSystem::new();
        fs.write_file(&dir.path().join("a.jpg"), Bytes::from_static(b"a"))
            .await
            .unwrap();
        fs.write_file(&dir.path().join("sub").join("b.jpg"), Bytes::from_static(b"b"))
            .await
            .unwrap();

        let mut entries = fs.list_directory(dir.path()).await.unwrap();
        entries.sort();
        assert_eq!(entries, vec![dir.path().join("a.jpg"), dir.path().join("sub")]);

        fs.delete_file(&dir.path().join("a.jpg")).await.unwrap();
        assert_eq!(fs.list_directory(dir.path()).await.unwrap(), vec![dir.path().join("sub")]);

        let err = fs.delete_file(&dir.path().join("a.jpg")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
