//! # Export Folder Sync
//!
//! Copies the results of an export folder's search into its directory.
//!
//! ## Overview
//!
//! A host scheduler calls [`ExportFolderSync::run_due`] (or
//! [`ExportFolderSync::do_work`] per folder) periodically. A run that is due:
//!
//! 1. **Check destination**: a missing directory skips the run but still
//!    records it as checked
//! 2. **Query**: matching hashes are shuffled and cut to the search's limit
//! 3. **Fetch**: media records are fetched in batches; the pause signal is
//!    polled before every batch and a paused run stops without saving
//! 4. **Copy**: each record is copied under its rendered filename unless an
//!    earlier record already produced that name or a file of the same size
//!    is already there
//! 5. **Prune**: `Synchronise` folders delete files this run did not produce
//! 6. **Record**: `last_checked` is advanced and the folder saved
//!
//! Folders run one after another; nothing here is concurrent.
//!
//! ## Usage
//!
//! ```ignore
//! use core_sync::ExportFolderSync;
//!
//! let sync = ExportFolderSync::new(&config, file_store, media_repo, folder_repo)
//!     .with_event_bus(event_bus.clone());
//!
//! let mut folders = folder_repo.load_all().await?;
//! sync.run_due(&mut folders).await;
//! ```

use crate::error::Result;
use crate::export_folder::{ExportFolder, ExportType};
use crate::export_phrase::{parse_export_phrase, render_export_filename, FilenameRules};
use crate::repository::ExportFolderRepository;
use bridge_traits::background::PauseSignal;
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::Clock;
use core_library::{
    ContentHash, FileLocator, MediaRecord, MediaRepository, SearchContext, ServiceKey,
};
use core_runtime::config::{CoreConfig, ExportSettings};
use core_runtime::events::{CoreEvent, EventBus, ExportEvent};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Directory name used for exports when none is configured.
pub const DEFAULT_EXPORT_DIR_NAME: &str = "vault_export";

/// Result of one [`ExportFolderSync::do_work`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The period has not elapsed; nothing was touched
    NotDue,
    /// The destination is missing or not a directory; the run was recorded
    DestinationUnavailable,
    /// The pause signal was raised mid-run; nothing was recorded
    Paused,
    Completed(ExportStats),
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub copied: u64,
    /// Skipped because a file of the same size was already in place
    pub already_present: u64,
    /// Skipped because an earlier record rendered the same filename
    pub duplicates: u64,
    pub deleted: u64,
    pub delete_failures: u64,
}

/// Runs export folders.
pub struct ExportFolderSync {
    locator: Arc<dyn FileLocator>,
    media: Arc<dyn MediaRepository>,
    repository: Arc<dyn ExportFolderRepository>,
    fs: Arc<dyn FileSystemAccess>,
    pause_signal: Arc<dyn PauseSignal>,
    clock: Arc<dyn Clock>,
    settings: ExportSettings,
    export_dir: Option<PathBuf>,
    rules: FilenameRules,
    event_bus: Option<EventBus>,
}

impl ExportFolderSync {
    pub fn new(
        config: &CoreConfig,
        locator: Arc<dyn FileLocator>,
        media: Arc<dyn MediaRepository>,
        repository: Arc<dyn ExportFolderRepository>,
    ) -> Self {
        Self {
            locator,
            media,
            repository,
            fs: config.file_system.clone(),
            pause_signal: config.pause_signal.clone(),
            clock: config.clock.clone(),
            settings: config.export.clone(),
            export_dir: config.export_dir.clone(),
            rules: FilenameRules::host(),
            event_bus: None,
        }
    }

    /// Publish run notices on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Override the filename rules, e.g. when exporting to a FAT or SMB share.
    pub fn with_filename_rules(mut self, rules: FilenameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Default destination for manual exports, created if missing.
    ///
    /// The configured export directory when set, otherwise
    /// `<home>/vault_export`.
    pub async fn default_export_dir(&self) -> Result<PathBuf> {
        let dir = match &self.export_dir {
            Some(dir) => dir.clone(),
            None => self
                .fs
                .get_home_directory()
                .await?
                .join(DEFAULT_EXPORT_DIR_NAME),
        };

        if !self.fs.exists(&dir).await? {
            self.fs.create_dir_all(&dir).await?;
            info!(path = ?dir, "Created export directory");
        }

        Ok(dir)
    }

    /// Run every due folder in order.
    ///
    /// A failing folder is logged and does not stop the rest. Results are in
    /// the same order as `folders`.
    pub async fn run_due(&self, folders: &mut [ExportFolder]) -> Vec<Result<ExportOutcome>> {
        let mut results = Vec::with_capacity(folders.len());

        for folder in folders.iter_mut() {
            let result = self.do_work(folder).await;
            if let Err(e) = &result {
                warn!(folder = %folder.name(), error = %e, "Export folder failed, continuing");
            }
            results.push(result);
        }

        results
    }

    /// Run one folder if its period has elapsed.
    ///
    /// # Errors
    ///
    /// A phrase that no longer parses, a source file missing from the store,
    /// a failed copy or a failed save aborts the run. The folder is left
    /// unsaved and an [`ExportEvent::Failed`] notice is published.
    #[instrument(skip(self, folder), fields(folder = %folder.name()))]
    pub async fn do_work(&self, folder: &mut ExportFolder) -> Result<ExportOutcome> {
        if !folder.is_due(self.clock.unix_timestamp()) {
            debug!("Export folder not due");
            return Ok(ExportOutcome::NotDue);
        }

        match self.run(folder).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(error = %e, "Export folder run failed");
                self.emit(ExportEvent::Failed {
                    folder: folder.name(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run(&self, folder: &mut ExportFolder) -> Result<ExportOutcome> {
        let destination = folder.path().to_path_buf();

        if !self.destination_available(&destination).await {
            warn!(path = ?destination, "Export destination is not a directory, skipping");
            self.record_checked(folder).await?;
            return Ok(ExportOutcome::DestinationUnavailable);
        }

        // Phase 1: query and fetch
        let Some(records) = self.fetch_records(folder.search()).await? else {
            info!("Export folders paused, abandoning run");
            self.emit(ExportEvent::Paused {
                folder: folder.name(),
            });
            return Ok(ExportOutcome::Paused);
        };

        let terms = parse_export_phrase(folder.phrase())?;

        // Phase 2: copy
        let previous = self.existing_filenames(&destination).await?;
        let mut produced: HashSet<OsString> = HashSet::with_capacity(records.len());
        let mut stats = ExportStats::default();

        for record in &records {
            let source = self.locator.file_path(&record.hash, Some(record.mime)).await?;
            let filename = render_export_filename(&terms, record, self.rules);
            let target = destination.join(&filename);

            if produced.contains(OsStr::new(&filename)) {
                debug!(hash = %record.hash, filename = %filename, "Filename already produced this run");
                stats.duplicates += 1;
            } else if self.already_present(&target, record.size).await {
                stats.already_present += 1;
            } else {
                self.fs.copy_file(&source, &target).await?;
                if let Err(e) = self.fs.set_read_write(&target).await {
                    debug!(filename = %filename, error = %e, "Could not reset permissions");
                }
                stats.copied += 1;
            }

            produced.insert(OsString::from(filename));
        }

        // Phase 3: prune
        if folder.export_type() == ExportType::Synchronise {
            self.prune(folder, &destination, &previous, &produced, &mut stats)
                .await;
        }

        self.record_checked(folder).await?;

        info!(
            records = records.len(),
            copied = stats.copied,
            already_present = stats.already_present,
            duplicates = stats.duplicates,
            deleted = stats.deleted,
            "Export folder run completed"
        );
        self.emit(ExportEvent::Completed {
            folder: folder.name(),
            copied: stats.copied,
            deleted: stats.deleted,
        });

        Ok(ExportOutcome::Completed(stats))
    }

    async fn destination_available(&self, destination: &Path) -> bool {
        match self.fs.is_directory(destination).await {
            Ok(is_dir) => is_dir,
            Err(e) => {
                debug!(path = ?destination, error = %e, "Could not inspect export destination");
                false
            }
        }
    }

    /// Matching records in shuffled order, or `None` if paused.
    ///
    /// Records always come from the local files service; a search over any
    /// other service only narrows which hashes are wanted.
    async fn fetch_records(&self, search: &SearchContext) -> Result<Option<Vec<MediaRecord>>> {
        let mut hashes: Vec<ContentHash> = self
            .media
            .query_matching_hashes(search)
            .await?
            .into_iter()
            .collect();

        hashes.shuffle(&mut rand::thread_rng());

        if let Some(limit) = search.limit() {
            hashes.truncate(limit);
        }

        debug!(count = hashes.len(), "Fetching media records");

        let mut records = Vec::with_capacity(hashes.len());
        for batch in hashes.chunks(self.settings.batch_size.max(1)) {
            if self.pause_signal.is_paused() {
                return Ok(None);
            }

            let fetched = self
                .media
                .fetch_media_records(&ServiceKey::local_files(), batch)
                .await?;
            records.extend(fetched);
        }

        Ok(Some(records))
    }

    /// Names of the regular files directly under `destination`, exactly as
    /// the platform reports them.
    async fn existing_filenames(&self, destination: &Path) -> Result<HashSet<OsString>> {
        let mut names = HashSet::new();

        for entry in self.fs.list_directory(destination).await? {
            if self.fs.is_directory(&entry).await.unwrap_or(true) {
                continue;
            }
            if let Some(name) = entry.file_name() {
                names.insert(name.to_os_string());
            }
        }

        Ok(names)
    }

    async fn already_present(&self, target: &Path, size: u64) -> bool {
        match self.fs.metadata(target).await {
            Ok(meta) => !meta.is_directory && meta.size == size,
            Err(_) => false,
        }
    }

    async fn prune(
        &self,
        folder: &ExportFolder,
        destination: &Path,
        previous: &HashSet<OsString>,
        produced: &HashSet<OsString>,
        stats: &mut ExportStats,
    ) {
        for name in previous.difference(produced) {
            let filename = name.to_string_lossy();
            match self.fs.delete_file(&destination.join(name)).await {
                Ok(()) => {
                    debug!(filename = %filename, "Deleted file no longer matched");
                    stats.deleted += 1;
                }
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Could not delete stale export file");
                    stats.delete_failures += 1;
                    self.emit(ExportEvent::DeleteFailed {
                        folder: folder.name(),
                        filename: filename.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn record_checked(&self, folder: &mut ExportFolder) -> Result<()> {
        folder.mark_checked(self.clock.unix_timestamp());
        self.repository.save(folder).await
    }

    fn emit(&self, event: ExportEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Export(event)).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export_folder::ExportFolderSettings;
    use async_trait::async_trait;
    use bridge_desktop::TokioFileSystem;
    use bridge_traits::SharedPauseFlag;
    use core_library::{LibraryError, Mime, ServiceKey, TagsView};
    use bridge_traits::BridgeError;
    use mockall::{mock, predicate::*};

    mock! {
        Media {}

        #[async_trait]
        impl MediaRepository for Media {
            async fn query_matching_hashes(&self, search: &SearchContext) -> core_library::Result<HashSet<ContentHash>>;
            async fn fetch_media_records(
                &self,
                service_key: &ServiceKey,
                hashes: &[ContentHash],
            ) -> core_library::Result<Vec<MediaRecord>>;
        }
    }

    mock! {
        Locator {}

        #[async_trait]
        impl FileLocator for Locator {
            async fn file_path(&self, hash: &ContentHash, mime: Option<Mime>) -> core_library::Result<PathBuf>;
        }
    }

    mock! {
        Repo {}

        #[async_trait]
        impl ExportFolderRepository for Repo {
            async fn save(&self, folder: &ExportFolder) -> Result<()>;
            async fn load_all(&self) -> Result<Vec<ExportFolder>>;
            async fn delete(&self, name: &str) -> Result<()>;
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        destination: PathBuf,
        pause: SharedPauseFlag,
        config: CoreConfig,
    }

    fn fixture(batch_size: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("export");
        std::fs::create_dir_all(&destination).unwrap();
        let pause = SharedPauseFlag::new();

        let config = CoreConfig::builder()
            .files_dir(dir.path().join("files"))
            .thumbnails_dir(dir.path().join("thumbnails"))
            .updates_dir(dir.path().join("updates"))
            .export_settings(ExportSettings {
                batch_size,
                ..ExportSettings::default()
            })
            .file_system(Arc::new(TokioFileSystem::new()))
            .pause_signal(Arc::new(pause.clone()))
            .build()
            .unwrap();

        Fixture {
            _dir: dir,
            destination,
            pause,
            config,
        }
    }

    fn folder(path: &Path) -> ExportFolder {
        ExportFolder::new(ExportFolderSettings::new(path, &ExportSettings::default())).unwrap()
    }

    fn hashes(count: u8) -> HashSet<ContentHash> {
        (0..count).map(|b| ContentHash::from_bytes([b; 32])).collect()
    }

    #[tokio::test]
    async fn test_fetches_in_batches() {
        let fx = fixture(2);

        let mut media = MockMedia::new();
        media
            .expect_query_matching_hashes()
            .returning(|_| Ok(hashes(5)));
        media
            .expect_fetch_media_records()
            .times(3)
            .returning(|_, batch| {
                assert!(batch.len() <= 2);
                Ok(Vec::new())
            });

        let mut repo = MockRepo::new();
        repo.expect_save().times(1).returning(|_| Ok(()));

        let sync = ExportFolderSync::new(
            &fx.config,
            Arc::new(MockLocator::new()),
            Arc::new(media),
            Arc::new(repo),
        );

        let mut folder = folder(&fx.destination);
        let outcome = sync.do_work(&mut folder).await.unwrap();

        assert_eq!(outcome, ExportOutcome::Completed(ExportStats::default()));
        assert!(folder.last_checked() > 0);
    }

    #[tokio::test]
    async fn test_records_come_from_local_files_service() {
        let fx = fixture(256);
        let remote = ServiceKey::new(b"remote tag service".to_vec());

        let mut media = MockMedia::new();
        let searched = remote.clone();
        media
            .expect_query_matching_hashes()
            .withf(move |search| search.file_service_key == searched)
            .returning(|_| Ok(hashes(2)));
        media
            .expect_fetch_media_records()
            .withf(|key, _| *key == ServiceKey::local_files())
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let mut repo = MockRepo::new();
        repo.expect_save().returning(|_| Ok(()));

        let sync = ExportFolderSync::new(
            &fx.config,
            Arc::new(MockLocator::new()),
            Arc::new(media),
            Arc::new(repo),
        );

        let mut settings = ExportFolderSettings::new(&fx.destination, &ExportSettings::default());
        settings.search = SearchContext::new(remote);
        let mut folder = ExportFolder::new(settings).unwrap();

        assert!(matches!(
            sync.do_work(&mut folder).await.unwrap(),
            ExportOutcome::Completed(_)
        ));
    }

    #[tokio::test]
    async fn test_pause_abandons_run_without_saving() {
        let fx = fixture(2);
        fx.pause.pause();

        let mut media = MockMedia::new();
        media
            .expect_query_matching_hashes()
            .returning(|_| Ok(hashes(3)));
        media.expect_fetch_media_records().never();

        let mut repo = MockRepo::new();
        repo.expect_save().never();

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();

        let sync = ExportFolderSync::new(
            &fx.config,
            Arc::new(MockLocator::new()),
            Arc::new(media),
            Arc::new(repo),
        )
        .with_event_bus(bus.clone());

        let mut folder = folder(&fx.destination);
        assert_eq!(sync.do_work(&mut folder).await.unwrap(), ExportOutcome::Paused);
        assert_eq!(folder.last_checked(), 0);

        assert!(matches!(
            events.try_recv().unwrap(),
            CoreEvent::Export(ExportEvent::Paused { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_source_fails_run() {
        let fx = fixture(256);
        let hash = ContentHash::from_bytes([7; 32]);

        let mut media = MockMedia::new();
        media
            .expect_query_matching_hashes()
            .returning(move |_| Ok(HashSet::from([hash])));
        media.expect_fetch_media_records().returning(move |_, _| {
            Ok(vec![MediaRecord::new(hash, Mime::Png, 3, TagsView::default())])
        });

        let mut locator = MockLocator::new();
        locator
            .expect_file_path()
            .with(eq(hash), eq(Some(Mime::Png)))
            .returning(|hash, _| {
                Err(LibraryError::NotFound {
                    hash: hash.to_hex(),
                })
            });

        let mut repo = MockRepo::new();
        repo.expect_save().never();

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();

        let sync = ExportFolderSync::new(&fx.config, Arc::new(locator), Arc::new(media), Arc::new(repo))
            .with_event_bus(bus.clone());

        let mut folder = folder(&fx.destination);
        let err = sync.do_work(&mut folder).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(folder.last_checked(), 0);
        assert!(matches!(
            events.try_recv().unwrap(),
            CoreEvent::Export(ExportEvent::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_due_continues_past_failures() {
        let fx = fixture(256);

        let mut media = MockMedia::new();
        media
            .expect_query_matching_hashes()
            .returning(|_| Ok(HashSet::new()));

        let mut repo = MockRepo::new();
        let mut first = true;
        repo.expect_save().times(2).returning(move |_| {
            if std::mem::take(&mut first) {
                Err(BridgeError::OperationFailed("disk full".to_string()).into())
            } else {
                Ok(())
            }
        });

        let sync = ExportFolderSync::new(
            &fx.config,
            Arc::new(MockLocator::new()),
            Arc::new(media),
            Arc::new(repo),
        );

        let mut folders = vec![folder(&fx.destination), folder(&fx.destination.join("missing"))];
        let results = sync.run_due(&mut folders).await;

        assert!(results[0].is_err());
        assert_eq!(
            results[1].as_ref().unwrap(),
            &ExportOutcome::DestinationUnavailable
        );
        assert!(folders[1].last_checked() > 0);
    }

    #[tokio::test]
    async fn test_default_export_dir_created_under_home() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::builder()
            .files_dir(dir.path().join("files"))
            .thumbnails_dir(dir.path().join("thumbnails"))
            .updates_dir(dir.path().join("updates"))
            .file_system(Arc::new(TokioFileSystem::with_home_directory(dir.path().to_path_buf())))
            .build()
            .unwrap();

        let sync = ExportFolderSync::new(
            &config,
            Arc::new(MockLocator::new()),
            Arc::new(MockMedia::new()),
            Arc::new(MockRepo::new()),
        );

        let export_dir = sync.default_export_dir().await.unwrap();
        assert_eq!(export_dir, dir.path().join(DEFAULT_EXPORT_DIR_NAME));
        assert!(export_dir.is_dir());
    }
}
