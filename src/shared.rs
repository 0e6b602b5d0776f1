//! Shared: reference-counted ownership through a control block.

use crate::alloc::{AllocError, Allocator, Global};
use crate::control_block::{self, Link};
use crate::deleter::Deleter;
use crate::error::HandleError;
use crate::exclusive::{Exclusive, Owned};
use crate::weak::Weak;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;

/// One of possibly many owners of a resource.
///
/// Cloning adds a strong unit; dropping returns it. The last strong unit
/// destroys the resource through the control block's destruction entry,
/// which was bound to the concrete type when the block was created.
///
/// Prefer passing `&Shared<T>` to functions that do not keep the handle:
/// borrowing costs no count traffic.
pub struct Shared<T: ?Sized> {
    link: Option<Link<T>>,
    _owns: PhantomData<T>,
}

// SAFETY: the counts are atomic; the resource is shared across threads and
// may be destroyed on any of them.
unsafe impl<T: ?Sized + Send + Sync> Send for Shared<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for Shared<T> {}

/// Create a `Shared` owning `value`. Counts and value share one allocation.
pub fn make_shared<T: 'static>(value: T) -> Shared<T> {
    Shared::new(value)
}

impl<T: 'static> Shared<T> {
    /// Same as [`make_shared`].
    pub fn new(value: T) -> Self {
        Self::new_in(value, Global)
    }

    /// Place the control block, `alloc` and `value` in one allocation from `alloc`.
    pub fn new_in<A>(value: T, alloc: A) -> Self
    where
        A: Allocator + Send + 'static,
    {
        Self::try_new_in(value, alloc)
            .unwrap_or_else(|e| std::alloc::handle_alloc_error(e.layout()))
    }

    /// Like [`Shared::new_in`], reporting allocation failure.
    pub fn try_new_in<A>(value: T, alloc: A) -> Result<Self, AllocError>
    where
        A: Allocator + Send + 'static,
    {
        control_block::allocate_inline(value, alloc).map(Self::from_link)
    }
}

impl<T: ?Sized + 'static> Shared<T> {
    /// Adopt a `Box`-allocated resource. The control block is a separate
    /// allocation.
    pub fn from_box(value: Box<T>) -> Self {
        Exclusive::from_box(value).into()
    }

    /// Adopt a resource allocated as a `Box<T>`. A null pointer yields an
    /// empty handle.
    ///
    /// # Safety
    ///
    /// `raw` must come from `Box::into_raw` and must not be owned by anything
    /// else. In particular, adopting a pointer that another `Shared` family
    /// already owns creates a second, independent control block and the
    /// resource is destroyed twice. This cannot be detected.
    pub unsafe fn from_raw(raw: *mut T) -> Self {
        Exclusive::from_raw(raw).into()
    }

    /// Adopt a resource that `deleter` will release when the last strong
    /// handle drops.
    ///
    /// # Safety
    ///
    /// Same obligations as [`Shared::from_raw`], with `deleter` able to
    /// release `raw`.
    pub unsafe fn from_raw_with<D>(raw: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + Send + 'static,
    {
        Exclusive::from_raw_with(raw, deleter).into()
    }
}

impl<T: ?Sized> Shared<T> {
    /// Wrap a link whose strong unit the caller hands over.
    pub(crate) fn from_link(link: Link<T>) -> Self {
        Self {
            link: Some(link),
            _owns: PhantomData,
        }
    }

    /// True if the handle owns nothing.
    pub fn is_empty(&self) -> bool {
        self.link.is_none()
    }

    /// Borrow the resource, or `None` for an empty handle.
    pub fn get(&self) -> Option<&T> {
        // SAFETY: our strong unit keeps the resource alive.
        self.link.as_ref().map(|l| unsafe { l.ptr.as_ref() })
    }

    /// Borrow the resource, or `NullDereference` for an empty handle.
    pub fn try_get(&self) -> Result<&T, HandleError> {
        self.get().ok_or(HandleError::NullDereference)
    }

    /// Mutable access when this is the only handle of any kind.
    ///
    /// Always `None` after `coerce`: a view obtained from `&T` is read-only.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        let link = self.link.as_mut()?;
        if !link.writable {
            return None;
        }
        let counts = link.header().counts();
        if counts.strong() == 1 && counts.weak() == 0 {
            // SAFETY: no other strong handle exists, and no weak handle can
            // produce one.
            Some(unsafe { link.ptr.as_mut() })
        } else {
            None
        }
    }

    /// Address of the resource view, without touching the counts.
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.link.as_ref().map(|l| l.ptr)
    }

    /// Number of strong handles sharing the resource; 0 for an empty handle.
    ///
    /// Diagnostic only: other threads may change it immediately.
    pub fn strong_count(&self) -> usize {
        self.link.as_ref().map_or(0, |l| l.header().counts().strong())
    }

    /// Number of weak handles observing the resource; 0 for an empty handle.
    pub fn weak_count(&self) -> usize {
        self.link.as_ref().map_or(0, |l| l.header().counts().weak())
    }

    /// Create a weak observer. An empty handle yields an empty `Weak`.
    pub fn weaken(&self) -> Weak<T> {
        match &self.link {
            Some(link) => {
                link.header().counts().get_weak();
                Weak::from_link(*link)
            }
            None => Weak::new(),
        }
    }

    /// Give up this strong unit, leaving the handle empty.
    pub fn reset(&mut self) {
        if let Some(link) = self.link.take() {
            // SAFETY: we owned one strong unit.
            unsafe { control_block::put_strong(link.block) };
        }
    }

    /// Move ownership out, leaving this handle empty. No count changes.
    pub fn take(&mut self) -> Self {
        Self {
            link: self.link.take(),
            _owns: PhantomData,
        }
    }

    /// True if both handles share one control block.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.link, &other.link) {
            (Some(a), Some(b)) => a.block == b.block,
            (None, None) => true,
            _ => false,
        }
    }

    /// View the resource as `U`, usually a trait object:
    /// `handle.coerce(|s| s as &dyn Shape)`. The strong unit moves over.
    ///
    /// The view is read-only: `get_mut` on the result always returns `None`.
    pub fn coerce<U: ?Sized>(mut self, f: impl FnOnce(&T) -> &U) -> Shared<U>
    where
        T: Send,
    {
        match self.link.take() {
            Some(link) => {
                // SAFETY: our strong unit keeps the resource alive.
                let view = NonNull::from(f(unsafe { link.ptr.as_ref() }));
                Shared::from_link(link.with_shared_view(view))
            }
            None => Shared::default(),
        }
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        if let Some(link) = &self.link {
            link.header().counts().get_strong();
        }
        Self {
            link: self.link,
            _owns: PhantomData,
        }
    }
}

impl<T: ?Sized> Drop for Shared<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized> Default for Shared<T> {
    fn default() -> Self {
        Self {
            link: None,
            _owns: PhantomData,
        }
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(v) => v,
            None => panic!("{}", HandleError::NullDereference),
        }
    }
}

/// Moves the exclusive handle's bound deleter into a new control block.
impl<T: ?Sized> From<Exclusive<T>> for Shared<T> {
    fn from(value: Exclusive<T>) -> Self {
        match value.into_owned() {
            Some(Owned { ptr, dispatch }) => {
                Self::from_link(control_block::allocate_remote(ptr, dispatch))
            }
            None => Self::default(),
        }
    }
}

impl<T: ?Sized> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: ?Sized> Eq for Shared<T> {}

impl<T: ?Sized> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.link
            .as_ref()
            .map(|l| l.block.as_ptr() as usize)
            .hash(state);
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("Shared").field(&v).finish(),
            None => f.write_str("Shared(<empty>)"),
        }
    }
}
