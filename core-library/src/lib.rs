//! # Library Management Module
//!
//! Owns the content-addressed file layout and the read-side view of the media
//! database.
//!
//! ## Overview
//!
//! This module manages:
//! - Content hashes, mime types, tags and media records
//! - The sharded path scheme for files, thumbnails and update packages
//! - Resolving hashes to stored files
//! - The query interface export folders consume

pub mod error;
pub mod file_store;
pub mod models;
pub mod paths;
pub mod query;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use file_store::{FileLocator, FileStore};
pub use models::{ContentHash, MediaRecord, Mime, ServiceKey, TagsView};
pub use paths::PathScheme;
pub use query::{SearchContext, SystemPredicates};
pub use repositories::{InMemoryMediaRepository, MediaRepository};
