use core_library::LibraryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Thumbnail for {hash} is unavailable: {message}")]
    NotFound { hash: String, message: String },

    #[error("Could not regenerate thumbnail {} for {hash}: {reason}", .path.display())]
    Regeneration {
        hash: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Image processing failed: {message}")]
    ImageProcessing { message: String },

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

impl MetadataError {
    pub fn is_not_found(&self) -> bool {
        match self {
            MetadataError::NotFound { .. } => true,
            MetadataError::Library(e) => e.is_not_found(),
            MetadataError::Bridge(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
