//! Pool: an allocator that recycles freed blocks per layout.
//!
//! Freed blocks are kept on a free list keyed by their exact `Layout` and
//! handed out again for the next request with that layout. Handles built
//! with `Exclusive::new_in`/`Shared::new_in` over an `Arc<Pool>` therefore
//! reuse storage across short-lived resources, and the pool's counters show
//! exactly when handle storage is returned.

use crate::alloc::{dangling, AllocError, Allocator, Global};
use core::alloc::Layout;
use core::ptr::NonNull;
use hashbrown::HashMap;
use log::{debug, trace};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Tuning for a [`Pool`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PoolConfig {
    /// Freed blocks kept per layout; further frees go back to the system.
    pub max_cached_per_layout: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_cached_per_layout: 64,
        }
    }
}

/// Counters for a [`Pool`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    /// Blocks obtained from the system allocator.
    pub fresh: usize,
    /// Requests served from the free lists.
    pub reused: usize,
    /// Blocks handed out and not yet returned.
    pub outstanding: usize,
    /// Blocks currently held on free lists.
    pub cached: usize,
}

struct FreeBlock(NonNull<u8>);

// SAFETY: a free block is plain storage owned by the pool.
unsafe impl Send for FreeBlock {}

struct State {
    free: HashMap<Layout, Vec<FreeBlock>>,
    stats: PoolStats,
}

pub struct Pool {
    config: PoolConfig,
    state: Mutex<State>,
}

impl Pool {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State {
                free: HashMap::new(),
                stats: PoolStats::default(),
            }),
        }
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    pub fn stats(&self) -> PoolStats {
        self.lock().stats
    }

    /// Return every cached block to the system allocator.
    pub fn trim(&self) {
        let mut state = self.lock();
        let mut released = 0;
        for (layout, blocks) in state.free.drain() {
            for FreeBlock(ptr) in blocks {
                // SAFETY: cached blocks came from `Global` with this layout.
                unsafe { Global.deallocate(ptr, layout) };
                released += 1;
            }
        }
        state.stats.cached = 0;
        debug!("pool trimmed, released {released} cached blocks");
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Counters and free lists stay consistent across a panic elsewhere.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Pool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

unsafe impl Allocator for Pool {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Ok(dangling(layout));
        }
        let mut state = self.lock();
        let cached = state.free.get_mut(&layout).and_then(Vec::pop);
        let ptr = match cached {
            Some(FreeBlock(ptr)) => {
                trace!("pool reused block for {layout:?}");
                state.stats.reused += 1;
                state.stats.cached -= 1;
                ptr
            }
            None => {
                let ptr = Global.allocate(layout)?;
                state.stats.fresh += 1;
                ptr
            }
        };
        state.stats.outstanding += 1;
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        let mut guard = self.lock();
        let state = &mut *guard;
        state.stats.outstanding -= 1;
        let list = state.free.entry(layout).or_default();
        if list.len() < self.config.max_cached_per_layout {
            list.push(FreeBlock(ptr));
            state.stats.cached += 1;
        } else {
            debug!("pool free list full for {layout:?}, releasing block");
            Global.deallocate(ptr, layout);
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.trim();
    }
}
