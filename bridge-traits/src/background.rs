//! Background Work Control
//!
//! Provides the process-wide pause switch consulted by recurring background
//! work such as export folder synchronisation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pause switch for recurring background work
///
/// Export folder synchronisation polls this before fetching every batch of
/// media records. The value must be read fresh on each call; a run that
/// observes `true` stops immediately without recording progress.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::background::PauseSignal;
///
/// fn next_batch(signal: &dyn PauseSignal) -> Option<Batch> {
///     if signal.is_paused() {
///         return None;
///     }
///     // ...
/// }
/// ```
pub trait PauseSignal: Send + Sync {
    /// Whether background work should stop at its next checkpoint
    fn is_paused(&self) -> bool;
}

/// Shared atomic pause flag
///
/// Cloning yields a handle onto the same flag, so the UI can toggle it while
/// the scheduler reads it.
#[derive(Debug, Clone, Default)]
pub struct SharedPauseFlag {
    paused: Arc<AtomicBool>,
}

impl SharedPauseFlag {
    /// Create an unpaused flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause background work
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resume background work
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Set the flag explicitly
    pub fn set(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }
}

impl PauseSignal for SharedPauseFlag {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
