//! Errors surfaced by handle accessors.

use thiserror::Error;

/// Misuse of a handle, reported locally to the handle involved.
///
/// Constructing two independent owners over the same raw resource
/// ("double ownership") is not represented here: it cannot be detected and
/// is the safety precondition of every `unsafe fn from_raw*` constructor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum HandleError {
    /// Access through a handle that owns nothing.
    #[error("null dereference: the handle is empty")]
    NullDereference,
    /// `lock` on a weak handle whose resource has already been destroyed.
    #[error("upgrade failed: the resource has already been destroyed")]
    UpgradeExpired,
}
