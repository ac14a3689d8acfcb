//! # Core Runtime
//!
//! Shared plumbing for the library, metadata and sync crates: the
//! [`CoreConfig`] they are built from, subscriber setup in [`logging`], and
//! the [`EventBus`] they publish notices on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, ExportSettings, ThumbnailDimensions};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, ExportEvent, ThumbnailEvent};
