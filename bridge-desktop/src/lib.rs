//! # Desktop Host
//!
//! [`TokioFileSystem`] for macOS, Windows and Linux. Copies keep their
//! modification time and [`set_read_write`](bridge_traits::FileSystemAccess::set_read_write)
//! clears read-only bits, both of which export folders rely on.
//!
//! The pause switch and clock need nothing platform specific; use
//! [`SharedPauseFlag`](bridge_traits::SharedPauseFlag) and
//! [`SystemClock`](bridge_traits::SystemClock) directly.
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .files_dir(data_dir.join("client_files"))
//!     .thumbnails_dir(data_dir.join("client_thumbnails"))
//!     .updates_dir(data_dir.join("client_updates"))
//!     .file_system(Arc::new(TokioFileSystem::new()))
//!     .build()?;
//! ```

mod filesystem;

pub use filesystem::TokioFileSystem;
