//! Weak: non-owning observer of a shared resource.

use crate::control_block::{self, Link};
use crate::error::HandleError;
use crate::shared::Shared;
use core::fmt;

/// Observes a resource owned by a `Shared` family without keeping it alive.
///
/// Only obtainable from `Shared::weaken` or by cloning another `Weak`. It
/// keeps the control block allocated, so it can report expiry after the
/// resource is gone.
pub struct Weak<T: ?Sized> {
    link: Option<Link<T>>,
}

// SAFETY: a weak handle only touches the atomic counts until it upgrades,
// which requires the same bounds as `Shared`.
unsafe impl<T: ?Sized + Send + Sync> Send for Weak<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for Weak<T> {}

impl<T: ?Sized> Weak<T> {
    /// An observer of nothing; always expired.
    pub fn new() -> Self {
        Self { link: None }
    }

    /// Wrap a link whose weak unit the caller hands over.
    pub(crate) fn from_link(link: Link<T>) -> Self {
        Self { link: Some(link) }
    }

    /// Try to become an owner. Returns `None` once the resource has been
    /// destroyed, and from then on permanently.
    pub fn lock(&self) -> Option<Shared<T>> {
        let link = self.link?;
        if link.header().counts().try_get_strong() {
            Some(Shared::from_link(link))
        } else {
            None
        }
    }

    /// Same as [`Weak::lock`].
    pub fn upgrade(&self) -> Option<Shared<T>> {
        self.lock()
    }

    /// Like [`Weak::lock`], reporting `UpgradeExpired` instead of `None`.
    pub fn try_lock(&self) -> Result<Shared<T>, HandleError> {
        self.lock().ok_or(HandleError::UpgradeExpired)
    }

    /// True once the resource has been destroyed, or for an empty handle.
    pub fn expired(&self) -> bool {
        self.strong_count() == 0
    }

    /// Strong handles still owning the resource; 0 once expired.
    pub fn strong_count(&self) -> usize {
        self.link.as_ref().map_or(0, |l| l.header().counts().strong())
    }

    /// Weak handles observing the block, this one included.
    pub fn weak_count(&self) -> usize {
        self.link.as_ref().map_or(0, |l| l.header().counts().weak())
    }

    /// True if both observe the same control block, or both observe nothing.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.link, &other.link) {
            (Some(a), Some(b)) => a.block == b.block,
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ?Sized> Clone for Weak<T> {
    fn clone(&self) -> Self {
        if let Some(link) = &self.link {
            link.header().counts().get_weak();
        }
        Self { link: self.link }
    }
}

impl<T: ?Sized> Drop for Weak<T> {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            // SAFETY: we owned one weak unit.
            unsafe { control_block::put_weak(link.block) };
        }
    }
}

impl<T: ?Sized> Default for Weak<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> From<&Shared<T>> for Weak<T> {
    fn from(value: &Shared<T>) -> Self {
        value.weaken()
    }
}

impl<T: ?Sized> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(Weak)")
    }
}
