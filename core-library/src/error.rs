use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("File not found: {hash}")]
    NotFound { hash: String },

    #[error("File not found at {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Query failed: {0}")]
    Query(String),
}

impl LibraryError {
    pub fn is_not_found(&self) -> bool {
        match self {
            LibraryError::NotFound { .. } | LibraryError::PathNotFound(_) => true,
            LibraryError::Bridge(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
