//! Control blocks: counts plus the destruction entry points for one resource.
//!
//! Every block starts with a `Header`. Blocks come in two layouts:
//! - `InlineBlock<C, A>`: header, allocator and value in one allocation,
//!   produced by `make_shared`/`Shared::new_in`.
//! - `RemoteBlock`: header plus a `Dispatch` for a resource that lives in
//!   its own storage, produced when adopting a raw pointer or an
//!   `Exclusive`.
//!
//! Handles only ever see `NonNull<Header>`; the two function pointers in the
//! header recover the concrete layout.

use crate::alloc::{AllocError, Allocator};
use crate::counts::Counts;
use crate::destroy_once::DebugDestroyOnce;
use crate::dispatch::Dispatch;
use core::alloc::Layout;
use core::mem::ManuallyDrop;
use core::ptr::{self, NonNull};
use log::trace;

#[repr(C)]
pub(crate) struct Header {
    counts: Counts,
    /// Destroy the resource. Runs once, when the strong count reaches zero.
    destroy: unsafe fn(NonNull<Header>),
    /// Release the block's storage. Runs once, when the weak count reaches zero.
    free: unsafe fn(NonNull<Header>),
    once: DebugDestroyOnce,
}

impl Header {
    fn new(destroy: unsafe fn(NonNull<Header>), free: unsafe fn(NonNull<Header>)) -> Self {
        Self {
            counts: Counts::new(),
            destroy,
            free,
            once: DebugDestroyOnce::new(),
        }
    }

    pub(crate) fn counts(&self) -> &Counts {
        &self.counts
    }
}

/// A resource pointer paired with the block that owns it.
pub(crate) struct Link<T: ?Sized> {
    pub(crate) ptr: NonNull<T>,
    pub(crate) block: NonNull<Header>,
    /// False once the pointer came from a shared borrow; such a view may not
    /// even point into the resource and must never be written through.
    pub(crate) writable: bool,
}

impl<T: ?Sized> Clone for Link<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Link<T> {}

impl<T: ?Sized> Link<T> {
    pub(crate) fn header(&self) -> &Header {
        // SAFETY: a link is only held by a handle that owns a strong or weak
        // unit, which keeps the block allocated.
        unsafe { self.block.as_ref() }
    }

    /// Same block, a read-only view obtained from `&T`.
    pub(crate) fn with_shared_view<U: ?Sized>(self, ptr: NonNull<U>) -> Link<U> {
        Link {
            ptr,
            block: self.block,
            writable: false,
        }
    }
}

/// Return one strong unit; destroys the resource when it was the last.
///
/// # Safety
///
/// The caller owns a strong unit of `block` and gives it up.
pub(crate) unsafe fn put_strong(block: NonNull<Header>) {
    let header = block.as_ref();
    if !header.counts.put_strong() {
        return;
    }
    header.once.enter();
    (header.destroy)(block);
    // Return the implicit weak unit held on behalf of all strong handles.
    header.counts.clear_implicit();
    put_weak(block);
}

/// Return one weak unit; frees the block when it was the last.
///
/// # Safety
///
/// The caller owns a weak unit of `block` and gives it up.
pub(crate) unsafe fn put_weak(block: NonNull<Header>) {
    let free = {
        let header = block.as_ref();
        if !header.counts.put_weak() {
            return;
        }
        header.free
    };
    trace!("control block {:p} freed", block);
    free(block);
}

#[repr(C)]
struct InlineBlock<C, A> {
    header: Header,
    alloc: ManuallyDrop<A>,
    value: ManuallyDrop<C>,
}

impl<C, A: Allocator> InlineBlock<C, A> {
    /// Allocate one block holding the counts, the allocator and `value`.
    fn allocate(value: C, alloc: A) -> Result<Link<C>, AllocError> {
        let layout = Layout::new::<Self>();
        let raw = alloc.allocate(layout)?.cast::<Self>();
        // SAFETY: `raw` is fresh storage for `Self`.
        unsafe {
            raw.as_ptr().write(InlineBlock {
                header: Header::new(Self::destroy, Self::free),
                alloc: ManuallyDrop::new(alloc),
                value: ManuallyDrop::new(value),
            });
            let value = ptr::addr_of_mut!((*raw.as_ptr()).value).cast::<C>();
            Ok(Link {
                ptr: NonNull::new_unchecked(value),
                block: raw.cast(),
                writable: true,
            })
        }
    }

    unsafe fn destroy(block: NonNull<Header>) {
        let raw = block.cast::<Self>().as_ptr();
        trace!("destroying inline {}", core::any::type_name::<C>());
        ptr::drop_in_place(ptr::addr_of_mut!((*raw).value).cast::<C>());
    }

    unsafe fn free(block: NonNull<Header>) {
        let raw = block.cast::<Self>().as_ptr();
        let alloc = ManuallyDrop::into_inner(ptr::read(ptr::addr_of!((*raw).alloc)));
        alloc.deallocate(block.cast(), Layout::new::<Self>());
    }
}

/// Allocate a block that stores `value` inline.
pub(crate) fn allocate_inline<C, A>(value: C, alloc: A) -> Result<Link<C>, AllocError>
where
    C: 'static,
    A: Allocator + Send + 'static,
{
    InlineBlock::allocate(value, alloc)
}

#[repr(C)]
struct RemoteBlock {
    header: Header,
    dispatch: ManuallyDrop<Dispatch>,
}

impl RemoteBlock {
    unsafe fn destroy(block: NonNull<Header>) {
        let raw = block.cast::<Self>().as_ptr();
        let dispatch = ManuallyDrop::take(&mut (*raw).dispatch);
        dispatch.run();
    }

    unsafe fn free(block: NonNull<Header>) {
        drop(Box::from_raw(block.cast::<Self>().as_ptr()));
    }
}

/// Allocate a block that destroys `ptr` through `dispatch`.
pub(crate) fn allocate_remote<T: ?Sized>(ptr: NonNull<T>, dispatch: Dispatch) -> Link<T> {
    let block = Box::new(RemoteBlock {
        header: Header::new(RemoteBlock::destroy, RemoteBlock::free),
        dispatch: ManuallyDrop::new(dispatch),
    });
    let block = NonNull::from(Box::leak(block)).cast::<Header>();
    Link {
        ptr,
        block,
        writable: true,
    }
}
