//! # Export Folder Repository
//!
//! Persists export folders between runs.
//!
//! ## Overview
//!
//! [`ExportFolderRepository`] is what [`ExportFolderSync`](crate::ExportFolderSync)
//! saves through after every run. [`JsonExportFolderRepository`] keeps all
//! folders in one JSON document of [`SerialisableObject`] records, written
//! through the host's [`FileSystemAccess`].

use crate::error::{Result, SyncError};
use crate::export_folder::{ExportFolder, SerialisableObject};
use async_trait::async_trait;
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

// ============================================================================
// Repository Trait
// ============================================================================

/// Repository trait for export folder persistence
#[async_trait]
pub trait ExportFolderRepository: Send + Sync {
    /// Insert or replace the folder with the same name
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written
    async fn save(&self, folder: &ExportFolder) -> Result<()>;

    /// Every stored folder
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreadable or holds a record this
    /// version cannot load
    async fn load_all(&self) -> Result<Vec<ExportFolder>>;

    /// Remove a folder by name
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::FolderNotFound`] if no folder has that name
    async fn delete(&self, name: &str) -> Result<()>;
}

// ============================================================================
// JSON Implementation
// ============================================================================

/// Stores export folders as a JSON array in a single file.
pub struct JsonExportFolderRepository {
    path: PathBuf,
    fs: Arc<dyn FileSystemAccess>,
    /// Serialises read-modify-write cycles on `path`
    lock: Mutex<()>,
}

impl JsonExportFolderRepository {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystemAccess>) -> Self {
        Self {
            path: path.into(),
            fs,
            lock: Mutex::new(()),
        }
    }

    async fn read_objects(&self) -> Result<Vec<SerialisableObject>> {
        let data = match self.fs.read_file(&self.path).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_slice(&data)?)
    }

    async fn write_objects(&self, objects: &[SerialisableObject]) -> Result<()> {
        let data = serde_json::to_vec_pretty(objects)?;
        self.fs.write_file(&self.path, Bytes::from(data)).await?;
        debug!(path = ?self.path, count = objects.len(), "Wrote export folders");
        Ok(())
    }
}

#[async_trait]
impl ExportFolderRepository for JsonExportFolderRepository {
    async fn save(&self, folder: &ExportFolder) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut objects = self.read_objects().await?;
        let record = folder.to_record();

        match objects.iter_mut().find(|o| o.name() == record.name()) {
            Some(existing) => *existing = record,
            None => objects.push(record),
        }

        self.write_objects(&objects).await
    }

    async fn load_all(&self) -> Result<Vec<ExportFolder>> {
        let _guard = self.lock.lock().await;

        self.read_objects()
            .await?
            .into_iter()
            .map(ExportFolder::from_record)
            .collect()
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut objects = self.read_objects().await?;
        let before = objects.len();
        objects.retain(|o| o.name() != name);

        if objects.len() == before {
            warn!(folder = name, "Asked to delete an unknown export folder");
            return Err(SyncError::FolderNotFound(name.to_string()));
        }

        self.write_objects(&objects).await
    }
}
