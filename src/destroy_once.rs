//! Debug-only destroy-once guard.
//!
//! Embedded in every control block to detect a second run of the
//! destruction entry point. In debug builds a second `enter` panics. In
//! release builds this compiles to a zero-sized no-op.

#[cfg(debug_assertions)]
use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub(crate) struct DebugDestroyOnce {
    #[cfg(debug_assertions)]
    destroyed: AtomicBool,
}

impl DebugDestroyOnce {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            destroyed: AtomicBool::new(false),
        }
    }

    /// Mark the resource as destroyed. In debug builds, panics if it already was.
    #[inline]
    pub(crate) fn enter(&self) {
        #[cfg(debug_assertions)]
        {
            let was = self.destroyed.swap(true, Ordering::AcqRel);
            assert!(!was, "resource destroyed twice through one control block");
        }
    }
}

impl Default for DebugDestroyOnce {
    fn default() -> Self {
        Self::new()
    }
}
