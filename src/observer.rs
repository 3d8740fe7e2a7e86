//! External collaborator hook for progress reporting.
//!
//! The reference implementation printed directly to `std::cout` from deep
//! inside its directory-diffing code. That couples the algorithm to a
//! terminal and makes it untestable in isolation, so callers instead supply
//! an [`Observer`] implementation; both methods default to doing nothing, so
//! most callers only override what they care about.

/// Receives progress notifications from long-running operations
/// ([`crate::vdir::VDir::make_delta`], [`crate::vdir::VDir::apply_delta`],
/// [`crate::vdir::VDir::load_folder`]).
pub trait Observer {
    /// A human-readable status line, e.g. `"diffing file \"src/main.rs\""`.
    fn log(&self, _message: &str) {}

    /// Coarse position within a range, e.g. "file 3 of 12 processed" as
    /// `on_progress(3, 12)`. Matches spec.md §6's `progress(position, range)`
    /// pair rather than a normalized fraction, since callers (VDir's
    /// per-file milestones) naturally have whole-number counts on hand.
    fn on_progress(&self, _position: u64, _range: u64) {}
}

/// An [`Observer`] that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_observer_accepts_calls_without_panicking() {
        let obs = NullObserver;
        obs.log("anything");
        obs.on_progress(3, 12);
    }
}
