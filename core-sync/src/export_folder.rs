//! # Export Folders
//!
//! An export folder is a destination directory kept filled with the results
//! of a saved search. It is identified by its path.
//!
//! ## Overview
//!
//! - [`ExportType`] picks whether files that stop matching are removed
//! - [`ExportFolderSettings`] is the user-editable part of a folder
//! - [`ExportFolder`] adds the scheduling state (`last_checked`)
//! - [`SerialisableObject`] is the versioned on-disk form

use crate::error::{Result, SyncError};
use crate::export_phrase::parse_export_phrase;
use core_library::SearchContext;
use core_runtime::config::ExportSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How an export folder treats files it no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportType {
    /// Only add and update files
    Regular,
    /// Also delete files the search no longer produces
    Synchronise,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::Regular => "regular",
            ExportType::Synchronise => "synchronise",
        }
    }
}

impl FromStr for ExportType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regular" => Ok(ExportType::Regular),
            "synchronise" => Ok(ExportType::Synchronise),
            _ => Err(SyncError::InvalidFolder {
                folder: String::new(),
                reason: format!("Unknown export type: {}", s),
            }),
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of an export folder a user edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFolderSettings {
    pub path: PathBuf,
    pub export_type: ExportType,
    pub search: SearchContext,
    pub period_secs: u64,
    pub phrase: String,
}

impl ExportFolderSettings {
    /// Settings for a new folder at `path`, using the configured defaults.
    pub fn new(path: impl Into<PathBuf>, defaults: &ExportSettings) -> Self {
        Self {
            path: path.into(),
            export_type: ExportType::Regular,
            search: SearchContext::default(),
            period_secs: defaults.default_period_secs,
            phrase: defaults.default_phrase.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| SyncError::InvalidFolder {
            folder: self.path.display().to_string(),
            reason: reason.to_string(),
        };

        if self.path.as_os_str().is_empty() {
            return Err(invalid("path cannot be empty"));
        }
        if self.period_secs == 0 {
            return Err(invalid("period must be greater than 0"));
        }

        parse_export_phrase(&self.phrase)?;
        Ok(())
    }
}

/// A configured export folder and when it last ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFolder {
    settings: ExportFolderSettings,
    /// Unix seconds; 0 for a folder that has never run
    last_checked: i64,
}

impl ExportFolder {
    /// Create a folder that is due immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Phrase`] if the phrase does not parse, or
    /// [`SyncError::InvalidFolder`] for an empty path or zero period.
    pub fn new(settings: ExportFolderSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            last_checked: 0,
        })
    }

    /// The folder's path as text, which doubles as its name.
    pub fn name(&self) -> String {
        self.settings.path.display().to_string()
    }

    pub fn path(&self) -> &Path {
        &self.settings.path
    }

    pub fn export_type(&self) -> ExportType {
        self.settings.export_type
    }

    pub fn search(&self) -> &SearchContext {
        &self.settings.search
    }

    pub fn period_secs(&self) -> u64 {
        self.settings.period_secs
    }

    pub fn phrase(&self) -> &str {
        &self.settings.phrase
    }

    pub fn last_checked(&self) -> i64 {
        self.last_checked
    }

    pub fn settings(&self) -> &ExportFolderSettings {
        &self.settings
    }

    /// Replace the editable settings, keeping `last_checked`.
    ///
    /// Nothing changes if the new settings are rejected.
    pub fn apply_settings(&mut self, settings: ExportFolderSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Whether a full period has passed since the last run.
    pub fn is_due(&self, now: i64) -> bool {
        let period = i64::try_from(self.settings.period_secs).unwrap_or(i64::MAX);
        now >= self.last_checked.saturating_add(period)
    }

    pub fn mark_checked(&mut self, now: i64) {
        self.last_checked = now;
    }

    pub fn to_record(&self) -> SerialisableObject {
        SerialisableObject::ExportFolder(ExportFolderRecord {
            version: ExportFolderRecord::VERSION,
            name: self.name(),
            export_type: self.settings.export_type,
            search: self.settings.search.clone(),
            period_secs: self.settings.period_secs,
            phrase: self.settings.phrase.clone(),
            last_checked: self.last_checked,
        })
    }

    /// Rebuild a folder from its stored record.
    ///
    /// The phrase is not re-validated; a stored phrase that no longer parses
    /// is reported when the folder next runs.
    pub fn from_record(object: SerialisableObject) -> Result<Self> {
        let SerialisableObject::ExportFolder(record) = object;

        if record.version != ExportFolderRecord::VERSION {
            return Err(SyncError::UnsupportedVersion {
                object: "export folder".to_string(),
                found: record.version,
                expected: ExportFolderRecord::VERSION,
            });
        }

        Ok(Self {
            settings: ExportFolderSettings {
                path: PathBuf::from(record.name),
                export_type: record.export_type,
                search: record.search,
                period_secs: record.period_secs,
                phrase: record.phrase,
            },
            last_checked: record.last_checked,
        })
    }
}

/// Stored objects, tagged by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SerialisableObject {
    ExportFolder(ExportFolderRecord),
}

impl SerialisableObject {
    pub fn name(&self) -> &str {
        match self {
            SerialisableObject::ExportFolder(record) => &record.name,
        }
    }
}

/// On-disk form of an [`ExportFolder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFolderRecord {
    pub version: u32,
    pub name: String,
    pub export_type: ExportType,
    pub search: SearchContext,
    pub period_secs: u64,
    pub phrase: String,
    pub last_checked: i64,
}

impl ExportFolderRecord {
    pub const VERSION: u32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(phrase: &str) -> ExportFolderSettings {
        let mut settings = ExportFolderSettings::new("/exports/wallpapers", &ExportSettings::default());
        settings.phrase = phrase.to_string();
        settings
    }

    #[test]
    fn test_new_folder_uses_defaults_and_is_due() {
        let folder = ExportFolder::new(ExportFolderSettings::new(
            "/exports/wallpapers",
            &ExportSettings::default(),
        ))
        .unwrap();

        assert_eq!(folder.export_type(), ExportType::Regular);
        assert_eq!(folder.period_secs(), 3600);
        assert_eq!(folder.phrase(), "{hash}");
        assert_eq!(folder.last_checked(), 0);
        assert!(folder.is_due(3600));
        assert!(!folder.is_due(3599));
    }

    #[test]
    fn test_mark_checked_defers_next_run() {
        let mut folder = ExportFolder::new(settings("{hash}")).unwrap();
        folder.mark_checked(10_000);

        assert!(!folder.is_due(10_000));
        assert!(!folder.is_due(13_599));
        assert!(folder.is_due(13_600));
    }

    #[test]
    fn test_bad_phrase_rejected_at_edit_time() {
        let err = ExportFolder::new(settings("{hash")).unwrap_err();
        assert!(matches!(err, SyncError::Phrase { .. }));

        let mut folder = ExportFolder::new(settings("{hash}")).unwrap();
        folder.mark_checked(42);

        assert!(folder.apply_settings(settings("[series")).is_err());
        assert_eq!(folder.phrase(), "{hash}");

        folder.apply_settings(settings("[series] - {hash}")).unwrap();
        assert_eq!(folder.phrase(), "[series] - {hash}");
        assert_eq!(folder.last_checked(), 42);
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut zero = settings("{hash}");
        zero.period_secs = 0;
        assert!(matches!(
            ExportFolder::new(zero).unwrap_err(),
            SyncError::InvalidFolder { .. }
        ));
    }

    #[test]
    fn test_record_serde() {
        let mut synchronised = settings("[series]");
        synchronised.export_type = ExportType::Synchronise;
        synchronised.search = SearchContext::default().with_tag("series:metroid").with_limit(10);

        let mut folder = ExportFolder::new(synchronised).unwrap();
        folder.mark_checked(1_700_000_000);

        let json = serde_json::to_value(folder.to_record()).unwrap();
        assert_eq!(json["type"], "export_folder");
        assert_eq!(json["version"], 1);
        assert_eq!(json["export_type"], "synchronise");
        assert_eq!(json["name"], "/exports/wallpapers");

        let object: SerialisableObject = serde_json::from_value(json).unwrap();
        assert_eq!(object.name(), "/exports/wallpapers");
        assert_eq!(ExportFolder::from_record(object).unwrap(), folder);
    }

    #[test]
    fn test_record_version_checked() {
        let folder = ExportFolder::new(settings("{hash}")).unwrap();
        let SerialisableObject::ExportFolder(mut record) = folder.to_record();
        record.version = 7;

        let err = ExportFolder::from_record(SerialisableObject::ExportFolder(record)).unwrap_err();
        assert!(matches!(
            err,
            SyncError::UnsupportedVersion { found: 7, expected: 1, .. }
        ));
    }

    #[test]
    fn test_export_type_strings() {
        assert_eq!("synchronise".parse::<ExportType>().unwrap(), ExportType::Synchronise);
        assert_eq!(ExportType::Regular.to_string(), "regular");
        assert!("mirror".parse::<ExportType>().is_err());
    }
}
