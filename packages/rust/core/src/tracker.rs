//! Volatile per-category in-progress flags.
//!
//! The tracker is the only shared mutable state in the pipeline. `try_begin`
//! is a single atomic test-and-set: the check and the set happen under one
//! lock acquisition, so two concurrent callers can never both claim the same
//! category. State is process-local and resets on restart by design.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Per-category in-progress flag map.
#[derive(Debug, Default)]
pub struct InProgress {
    inner: Mutex<HashSet<String>>,
}

impl InProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim a category. Returns `false` when a run is already
    /// flagged for this key, in which case the caller must not dispatch.
    pub fn try_begin(&self, key: &str) -> bool {
        self.lock().insert(key.to_string())
    }

    /// Clear a category's flag. Clearing an absent key is a no-op.
    pub fn clear(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Whether a run is currently flagged for this key.
    pub fn is_running(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // A panicked holder only ever leaves a stale flag behind, which the
        // owning ClearGuard removes; the set itself stays consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears one category flag when dropped, so every exit path of a partition
/// run — success, error, or panic — releases the flag.
pub struct ClearGuard {
    tracker: Arc<InProgress>,
    key: String,
}

impl ClearGuard {
    pub fn new(tracker: Arc<InProgress>, key: impl Into<String>) -> Self {
        Self {
            tracker,
            key: key.into(),
        }
    }
}

impl Drop for ClearGuard {
    fn drop(&mut self) {
        self.tracker.clear(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_begin_is_single_flight() {
        let tracker = InProgress::new();
        assert!(tracker.try_begin("cs.LG"));
        assert!(!tracker.try_begin("cs.LG"));
        // Other keys are independent
        assert!(tracker.try_begin("cs.CV"));
    }

    #[test]
    fn clear_allows_restart() {
        let tracker = InProgress::new();
        assert!(tracker.try_begin("cs.LG"));
        tracker.clear("cs.LG");
        assert!(!tracker.is_running("cs.LG"));
        assert!(tracker.try_begin("cs.LG"));
    }

    #[test]
    fn clear_absent_key_is_noop() {
        let tracker = InProgress::new();
        tracker.clear("never-started");
        assert!(!tracker.is_running("never-started"));
    }

    #[test]
    fn guard_clears_on_drop() {
        let tracker = Arc::new(InProgress::new());
        assert!(tracker.try_begin("cs.LG"));
        {
            let _guard = ClearGuard::new(Arc::clone(&tracker), "cs.LG");
            assert!(tracker.is_running("cs.LG"));
        }
        assert!(!tracker.is_running("cs.LG"));
    }

    #[test]
    fn guard_clears_on_panic() {
        let tracker = Arc::new(InProgress::new());
        assert!(tracker.try_begin("cs.LG"));

        let inner = Arc::clone(&tracker);
        let result = std::thread::spawn(move || {
            let _guard = ClearGuard::new(inner, "cs.LG");
            panic!("partition run exploded");
        })
        .join();

        assert!(result.is_err());
        assert!(!tracker.is_running("cs.LG"));
    }

    #[test]
    fn concurrent_claims_admit_exactly_one() {
        let tracker = Arc::new(InProgress::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || tracker.try_begin("cs.LG"))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap_or(false))
            .filter(|&claimed| claimed)
            .count();
        assert_eq!(wins, 1);
    }
}
