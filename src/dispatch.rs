//! Destruction dispatch bound to a resource's concrete type.
//!
//! A `Dispatch` is created together with the resource, while its concrete
//! type `C` is still statically known. It captures the resource pointer as a
//! `NonNull<C>` plus the deleter for `C`, and erases both behind a trait
//! object. Handles that later view the resource as a trait object or a
//! sub-object never consult their own type to destroy it: they run the
//! dispatch, which deletes the original `C` with the original deleter.

use crate::deleter::Deleter;
use core::any::type_name;
use core::ptr::NonNull;
use log::trace;

trait Erased {
    /// # Safety
    ///
    /// Called at most once, when the bound resource has no remaining owners.
    unsafe fn destroy(&mut self);

    fn concrete_type(&self) -> &'static str;
}

struct Bound<C: ?Sized, D> {
    target: NonNull<C>,
    deleter: D,
}

// SAFETY: the deleter is `Send`. Whether the resource may be destroyed on
// another thread is decided by the owning handle's own `Send` bound, which
// is only satisfied when the concrete type is `Send` (see `coerce`).
unsafe impl<C: ?Sized, D: Send> Send for Bound<C, D> {}

impl<C, D> Erased for Bound<C, D>
where
    C: ?Sized,
    D: Deleter<C>,
{
    unsafe fn destroy(&mut self) {
        trace!("destroying {} through its bound deleter", type_name::<C>());
        self.deleter.delete(self.target);
    }

    fn concrete_type(&self) -> &'static str {
        type_name::<C>()
    }
}

/// Type-erased, run-once cleanup for one resource.
pub(crate) struct Dispatch {
    bound: Box<dyn Erased + Send>,
}

impl Dispatch {
    pub(crate) fn bind<C, D>(target: NonNull<C>, deleter: D) -> Self
    where
        C: ?Sized + 'static,
        D: Deleter<C> + Send + 'static,
    {
        Self {
            bound: Box::new(Bound { target, deleter }),
        }
    }

    /// Destroy the bound resource.
    ///
    /// # Safety
    ///
    /// The caller owns the resource and nothing accesses it afterwards.
    pub(crate) unsafe fn run(mut self) {
        self.bound.destroy();
    }

    /// Name of the type the resource was created as.
    pub(crate) fn concrete_type(&self) -> &'static str {
        self.bound.concrete_type()
    }
}

impl core::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatch")
            .field("concrete", &self.concrete_type())
            .finish()
    }
}
