//! Atomic strong/weak counters for a control block.
//!
//! The weak counter carries one implicit unit on behalf of all strong
//! handles together; that unit is returned after the resource is destroyed.
//! This keeps the block alive while the deleter runs, even if the resource
//! itself drops a weak handle to its own block.

use core::sync::atomic::{fence, AtomicBool, AtomicUsize, Ordering};

/// Counts beyond this are treated as overflow, matching `std::sync::Arc`.
const MAX_REFCOUNT: usize = isize::MAX as usize;

#[derive(Debug)]
pub(crate) struct Counts {
    strong: AtomicUsize,
    weak: AtomicUsize,
    /// Set until the implicit weak unit is returned, after destruction.
    implicit: AtomicBool,
}

impl Counts {
    /// One strong handle, no weak handles.
    pub(crate) const fn new() -> Self {
        Self {
            strong: AtomicUsize::new(1),
            weak: AtomicUsize::new(1),
            implicit: AtomicBool::new(true),
        }
    }

    pub(crate) fn strong(&self) -> usize {
        self.strong.load(Ordering::Acquire)
    }

    /// Number of weak handles, excluding the implicit unit held by strong ones.
    ///
    /// The implicit unit stays hidden while the resource is being destroyed.
    /// A read racing the final release on another thread may still be one
    /// too high for an instant.
    pub(crate) fn weak(&self) -> usize {
        let weak = self.weak.load(Ordering::Acquire);
        if self.implicit.load(Ordering::Acquire) {
            weak.saturating_sub(1)
        } else {
            weak
        }
    }

    /// Stop hiding the implicit weak unit; the caller returns it next.
    pub(crate) fn clear_implicit(&self) {
        self.implicit.store(false, Ordering::Release);
    }

    /// Acquire one strong unit. The caller already holds one.
    #[inline]
    pub(crate) fn get_strong(&self) {
        let old = self.strong.fetch_add(1, Ordering::Relaxed);
        if old > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    /// Acquire one strong unit unless the count has already reached zero.
    ///
    /// The zero check and the increment are one compare-exchange, so a
    /// concurrent final `put_strong` can never be undone.
    pub(crate) fn try_get_strong(&self) -> bool {
        let mut n = self.strong.load(Ordering::Relaxed);
        loop {
            if n == 0 {
                return false;
            }
            if n > MAX_REFCOUNT {
                std::process::abort();
            }
            match self
                .strong
                .compare_exchange_weak(n, n + 1, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(seen) => n = seen,
            }
        }
    }

    /// Return one strong unit. Returns true if the count is now zero.
    #[inline]
    pub(crate) fn put_strong(&self) -> bool {
        if self.strong.fetch_sub(1, Ordering::Release) != 1 {
            return false;
        }
        // Synchronize with every earlier release before the resource is destroyed.
        fence(Ordering::Acquire);
        true
    }

    #[inline]
    pub(crate) fn get_weak(&self) {
        let old = self.weak.fetch_add(1, Ordering::Relaxed);
        if old > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    /// Return one weak unit. Returns true if the block may now be freed.
    #[inline]
    pub(crate) fn put_weak(&self) -> bool {
        if self.weak.fetch_sub(1, Ordering::Release) != 1 {
            return false;
        }
        fence(Ordering::Acquire);
        true
    }
}
