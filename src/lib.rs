//! Workspace umbrella crate.
//!
//! Exposes feature flags that map onto the individual workspace crates
//! (`core-runtime`, `core-library`, `core-metadata`, `core-sync`). Host
//! applications can depend on `vault-workspace` and enable the documented
//! features without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_runtime;

#[cfg(any(feature = "thumbnails", feature = "export-folders", feature = "desktop-shims"))]
pub use core_library;

#[cfg(any(feature = "thumbnails", feature = "desktop-shims"))]
pub use core_metadata;

#[cfg(any(feature = "export-folders", feature = "desktop-shims"))]
pub use core_sync;
