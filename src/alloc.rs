//! Storage providers for handles.
//!
//! Handle construction over an allocator is split into explicit steps:
//! allocate storage, construct the value in it, destroy the value in place,
//! and deallocate the storage. Handles only ever perform the last two
//! through the deleter or control block bound at construction.

use core::alloc::Layout;
use core::ptr::NonNull;
use std::sync::Arc;
use thiserror::Error;

/// The allocator could not provide storage for `layout`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("allocation failed for {layout:?}")]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }
}

/// A source of raw storage.
///
/// # Safety
///
/// Implementors must return blocks valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, that stay valid until
/// passed back to `deallocate` on the same allocator (or a clone of it).
pub unsafe trait Allocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same `layout`
    /// and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Aligned, non-null pointer for zero-sized requests.
pub(crate) fn dangling(layout: Layout) -> NonNull<u8> {
    // Alignment is a non-zero power of two, so the address is never null.
    NonNull::new(layout.align() as *mut u8).unwrap_or(NonNull::dangling())
}

/// The standard allocator.
#[derive(Copy, Clone, Debug, Default)]
pub struct Global;

unsafe impl Allocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Ok(dangling(layout));
        }
        // SAFETY: layout has non-zero size.
        let raw = unsafe { std::alloc::alloc(layout) };
        NonNull::new(raw).ok_or(AllocError::new(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            std::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}

unsafe impl<A: Allocator + ?Sized> Allocator for Arc<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}
