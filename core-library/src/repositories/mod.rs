//! # Repository Pattern Implementation
//!
//! Repository traits describe how the core reads the media database. The
//! database itself belongs to the host; [`InMemoryMediaRepository`] covers
//! hosts without one and tests.

pub mod media;

pub use media::{InMemoryMediaRepository, MediaRepository};
