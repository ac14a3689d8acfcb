use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Could not parse export phrase '{phrase}': {reason}")]
    Phrase { phrase: String, reason: String },

    #[error("Invalid export folder {folder}: {reason}")]
    InvalidFolder { folder: String, reason: String },

    #[error("Export folder {0} not found")]
    FolderNotFound(String),

    #[error("Unsupported {object} record version {found} (expected {expected})")]
    UnsupportedVersion {
        object: String,
        found: u32,
        expected: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        match self {
            SyncError::FolderNotFound(_) => true,
            SyncError::Library(e) => e.is_not_found(),
            SyncError::Bridge(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
