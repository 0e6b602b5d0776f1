//! Cleanup capabilities invoked when the last owner lets go.

use crate::alloc::Allocator;
use core::alloc::Layout;
use core::ptr::{self, NonNull};

/// Releases one resource and its storage.
///
/// Any `FnMut(NonNull<T>)` closure is a deleter.
pub trait Deleter<T: ?Sized> {
    /// # Safety
    ///
    /// `ptr` is the resource this deleter was bound to. It is valid, owned by
    /// the caller, and is never used again after this call.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

impl<T: ?Sized, F> Deleter<T> for F
where
    F: FnMut(NonNull<T>),
{
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        self(ptr)
    }
}

/// Frees resources that were allocated as a `Box<T>`.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        drop(Box::from_raw(ptr.as_ptr()));
    }
}

/// Destroys the value in place, then returns its storage to `alloc`.
#[derive(Debug)]
pub struct AllocDelete<A> {
    alloc: A,
}

impl<A: Allocator> AllocDelete<A> {
    pub fn new(alloc: A) -> Self {
        Self { alloc }
    }
}

impl<T: ?Sized, A: Allocator> Deleter<T> for AllocDelete<A> {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        let layout = Layout::for_value(ptr.as_ref());
        ptr::drop_in_place(ptr.as_ptr());
        self.alloc.deallocate(ptr.cast(), layout);
    }
}
