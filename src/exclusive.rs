//! Exclusive: sole, movable ownership of one resource.

use crate::alloc::{AllocError, Allocator};
use crate::deleter::{AllocDelete, DefaultDelete, Deleter};
use crate::dispatch::Dispatch;
use crate::error::HandleError;
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

pub(crate) struct Owned<T: ?Sized> {
    pub(crate) ptr: NonNull<T>,
    pub(crate) dispatch: Dispatch,
}

/// Sole owner of a resource.
///
/// Not `Clone`: duplicating sole ownership does not compile. Dropping,
/// `reset`, or assigning over a non-empty handle destroys the resource
/// through the deleter bound when it was created, whatever `T` the handle
/// has been coerced to since.
pub struct Exclusive<T: ?Sized> {
    slot: Option<Owned<T>>,
    _owns: PhantomData<T>,
}

// SAFETY: sending the handle sends the resource. A coerced handle only
// exists when the concrete type was `Send` (see `coerce`).
unsafe impl<T: ?Sized + Send> Send for Exclusive<T> {}
// SAFETY: `&Exclusive<T>` only hands out `&T`; the dispatch is never shared.
unsafe impl<T: ?Sized + Sync> Sync for Exclusive<T> {}

/// Create an `Exclusive` owning `value` in storage from the standard allocator.
pub fn make_exclusive<T: 'static>(value: T) -> Exclusive<T> {
    Exclusive::new(value)
}

impl<T: 'static> Exclusive<T> {
    /// Box `value` and own it; same as [`make_exclusive`].
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    /// Allocate storage from `alloc` and construct `value` in it.
    pub fn new_in<A>(value: T, alloc: A) -> Self
    where
        A: Allocator + Send + 'static,
    {
        Self::try_new_in(value, alloc)
            .unwrap_or_else(|e| std::alloc::handle_alloc_error(e.layout()))
    }

    /// Like [`Exclusive::new_in`], reporting allocation failure.
    pub fn try_new_in<A>(value: T, alloc: A) -> Result<Self, AllocError>
    where
        A: Allocator + Send + 'static,
    {
        let raw = alloc.allocate(Layout::new::<T>())?.cast::<T>();
        // SAFETY: fresh storage for one `T`.
        unsafe { raw.as_ptr().write(value) };
        let dispatch = Dispatch::bind(raw, AllocDelete::new(alloc));
        Ok(Self::from_parts(raw, dispatch))
    }

    /// Destroy the current resource, then adopt `raw`.
    ///
    /// # Safety
    ///
    /// Same as [`Exclusive::from_raw`].
    pub unsafe fn reset_raw(&mut self, raw: *mut T) {
        self.reset();
        *self = Self::from_raw(raw);
    }
}

impl<T: ?Sized + 'static> Exclusive<T> {
    /// Take over a boxed resource; the box's drop glue becomes the deleter.
    pub fn from_box(value: Box<T>) -> Self {
        let raw = NonNull::from(Box::leak(value));
        Self::from_parts(raw, Dispatch::bind(raw, DefaultDelete))
    }

    /// Adopt a resource allocated as a `Box<T>`. A null pointer yields an
    /// empty handle.
    ///
    /// # Safety
    ///
    /// `raw` must come from `Box::into_raw` and must not be owned by anything
    /// else. Adopting a pointer that another handle also owns is double
    /// ownership and cannot be detected.
    pub unsafe fn from_raw(raw: *mut T) -> Self {
        match NonNull::new(raw) {
            Some(raw) => Self::from_parts(raw, Dispatch::bind(raw, DefaultDelete)),
            None => Self::default(),
        }
    }

    /// Adopt a resource that `deleter` will release. A null pointer yields
    /// an empty handle and drops `deleter` unused.
    ///
    /// # Safety
    ///
    /// `raw` must be valid for `deleter` to release and must not be owned by
    /// anything else.
    pub unsafe fn from_raw_with<D>(raw: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + Send + 'static,
    {
        match NonNull::new(raw) {
            Some(raw) => Self::from_parts(raw, Dispatch::bind(raw, deleter)),
            None => Self::default(),
        }
    }
}

impl<T: ?Sized> Exclusive<T> {
    pub(crate) fn from_parts(ptr: NonNull<T>, dispatch: Dispatch) -> Self {
        Self {
            slot: Some(Owned { ptr, dispatch }),
            _owns: PhantomData,
        }
    }

    pub(crate) fn into_owned(mut self) -> Option<Owned<T>> {
        self.slot.take()
    }

    /// True if the handle owns nothing.
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Borrow the resource, or `None` for an empty handle.
    pub fn get(&self) -> Option<&T> {
        // SAFETY: the resource is alive while owned.
        self.slot.as_ref().map(|o| unsafe { o.ptr.as_ref() })
    }

    /// Mutably borrow the resource, or `None` for an empty handle.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        // SAFETY: sole owner, borrowed mutably.
        self.slot.as_mut().map(|o| unsafe { o.ptr.as_mut() })
    }

    /// Borrow the resource, or `NullDereference` for an empty handle.
    pub fn try_get(&self) -> Result<&T, HandleError> {
        self.get().ok_or(HandleError::NullDereference)
    }

    /// Mutable counterpart of [`Exclusive::try_get`].
    pub fn try_get_mut(&mut self) -> Result<&mut T, HandleError> {
        self.get_mut().ok_or(HandleError::NullDereference)
    }

    /// Address of the resource, without giving up ownership.
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.slot.as_ref().map(|o| o.ptr)
    }

    /// Give up ownership without destroying the resource.
    ///
    /// The bound deleter is discarded; the caller becomes responsible for the
    /// resource. For handles created with `new`/`from_box`, `Box::from_raw`
    /// reclaims it.
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.slot.take().map(|o| o.ptr)
    }

    /// Destroy the resource, if any, and leave the handle empty.
    pub fn reset(&mut self) {
        if let Some(owned) = self.slot.take() {
            // SAFETY: we were the sole owner.
            unsafe { owned.dispatch.run() };
        }
    }

    /// Destroy the resource, if any, then adopt whatever `next` owns.
    pub fn reset_to(&mut self, mut next: Exclusive<T>) {
        self.reset();
        self.slot = next.slot.take();
    }

    /// Move ownership out, leaving this handle empty.
    pub fn take(&mut self) -> Self {
        Self {
            slot: self.slot.take(),
            _owns: PhantomData,
        }
    }

    /// View the resource as `U`, usually a trait object:
    /// `handle.coerce(|s| s as &mut dyn Shape)`.
    ///
    /// Destruction still runs the deleter bound to the concrete type.
    pub fn coerce<U: ?Sized>(mut self, f: impl FnOnce(&mut T) -> &mut U) -> Exclusive<U>
    where
        T: Send,
    {
        match self.slot.take() {
            Some(Owned { mut ptr, dispatch }) => {
                // SAFETY: sole owner; the returned view borrows the resource.
                let view = NonNull::from(f(unsafe { ptr.as_mut() }));
                Exclusive::from_parts(view, dispatch)
            }
            None => Exclusive::default(),
        }
    }

    /// Name of the type the resource was created as.
    pub fn concrete_type(&self) -> Option<&'static str> {
        self.slot.as_ref().map(|o| o.dispatch.concrete_type())
    }
}

impl<T: ?Sized> Default for Exclusive<T> {
    fn default() -> Self {
        Self {
            slot: None,
            _owns: PhantomData,
        }
    }
}

impl<T: ?Sized> Drop for Exclusive<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized> Deref for Exclusive<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(v) => v,
            None => panic!("{}", HandleError::NullDereference),
        }
    }
}

impl<T: ?Sized> DerefMut for Exclusive<T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(v) => v,
            None => panic!("{}", HandleError::NullDereference),
        }
    }
}

impl<T: ?Sized + 'static> From<Box<T>> for Exclusive<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Exclusive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("Exclusive").field(&v).finish(),
            None => f.write_str("Exclusive(<empty>)"),
        }
    }
}
