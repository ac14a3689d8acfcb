//! # Thumbnail Module
//!
//! Keeps the derived thumbnail store usable.
//!
//! ## Overview
//!
//! This module handles:
//! - Resolving full-size and scaled thumbnail paths by content hash
//! - Regenerating missing thumbnails from the original file
//! - Repairing unreadable full-size thumbnails with one bounded retry
//! - Rendering thumbnails with the `image` crate

pub mod codec;
pub mod error;
pub mod thumbnail;

pub use codec::{ImageThumbnailGenerator, ThumbnailGenerator};
pub use error::{MetadataError, Result};
pub use thumbnail::ThumbnailResolver;
