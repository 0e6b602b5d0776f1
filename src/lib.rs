//! owned-handles: exclusive, shared and weak ownership handles with
//! deterministic, thread-safe destruction through the resource's concrete
//! type.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: the three classic ownership handles, built in small layers so the
//!   counting, the dispatch and the storage can each be reasoned about alone.
//! - Layers:
//!   - Deleter / Allocator: how one resource's storage is released, and
//!     where storage comes from (`Global`, `Pool`, or anything implementing
//!     `Allocator`).
//!   - Dispatch: a deleter bound to the resource's concrete type at
//!     construction and erased behind a trait object.
//!   - Control block: atomic strong/weak counts plus two entry points,
//!     destroy (strong hits zero) and free (weak hits zero).
//!   - Handles: `Exclusive<T>` owns a `Dispatch` directly; `Shared<T>` and
//!     `Weak<T>` own units of a control block.
//!
//! Constraints
//! - Thread-safe: counts are atomic; `Shared`/`Weak` are `Send + Sync` when
//!   `T: Send + Sync`. The resource itself is not synchronized; shared
//!   ownership is not shared mutable access.
//! - `make_shared` places counts and value in one allocation.
//! - Every resource is destroyed exactly once, when its last owner goes away,
//!   by the deleter bound to its concrete type. Viewing a resource through a
//!   trait object (`coerce`) never changes how it is destroyed.
//! - Weak upgrade checks and increments the strong count in one
//!   compare-exchange; a weak handle never yields a destroyed resource.
//!
//! Error semantics
//! - Dereferencing an empty handle panics with `HandleError::NullDereference`;
//!   `try_get` reports it instead.
//! - A failed upgrade is `None` (or `HandleError::UpgradeExpired` from
//!   `try_lock`).
//! - Adopting a raw pointer that something else also owns is undefined
//!   behavior. It is the safety contract of every `unsafe fn from_raw*`, not
//!   a runtime check.
//!
//! Overflow semantics
//! - A count above `isize::MAX` aborts the process, matching `Arc`.
//!
//! Notes and non-goals
//! - No cycle collection: `Shared` cycles leak. Hold back-references as
//!   `Weak`.
//! - Rust moves are checked statically; `take()` is the runtime move that
//!   leaves an empty handle behind.
//! - Destruction happens on whichever thread drops the last owner, so custom
//!   deleters must be `Send`.

mod alloc;
mod control_block;
mod counts;
mod deleter;
mod destroy_once;
mod dispatch;
mod error;
mod exclusive;
mod pool;
mod shared;
mod weak;

// Public surface
pub use alloc::{AllocError, Allocator, Global};
pub use deleter::{AllocDelete, DefaultDelete, Deleter};
pub use error::HandleError;
pub use exclusive::{make_exclusive, Exclusive};
pub use pool::{Pool, PoolConfig, PoolStats};
pub use shared::{make_shared, Shared};
pub use weak::Weak;
