//! Error and status types.
//!
//! `PoolError` follows this codebase's existing `AllocError` idiom: a plain
//! enum with a hand-written `Display`/`std::error::Error` impl rather than a
//! `thiserror` derive.

use core::fmt;

/// The outcome of a [`PoolAllocator::free`](crate::PoolAllocator::free) call.
///
/// Discriminants reuse the poison-signature bytes from [`crate::signature`],
/// so the raw byte a caller observes matches the value this enum carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FreeStatus {
    /// The block was freed successfully.
    Ok = 0x00,
    /// `free` was called with an address that is not a valid block boundary.
    Align = crate::signature::ALIGN,
    /// `free` was called on a block that is already free.
    Freed = crate::signature::FREED,
    /// The pad canaries surrounding the block had been overwritten.
    Pad = crate::signature::PAD,
}

impl FreeStatus {
    /// True if this status represents success.
    pub const fn is_ok(self) -> bool {
        matches!(self, FreeStatus::Ok)
    }
}

impl fmt::Display for FreeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreeStatus::Ok => f.write_str("ok"),
            FreeStatus::Align => f.write_str("invalid alignment"),
            FreeStatus::Freed => f.write_str("already freed"),
            FreeStatus::Pad => f.write_str("pad canary violated"),
        }
    }
}

/// The error kinds raised (as panics, under the `exceptions` feature) or
/// logged (otherwise) by the pool, handle, and smart-pointer layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// `Free` called with an address not on a block boundary.
    InvalidAlignment,
    /// `Free` called on a block already marked free, or a `SmartPointer`
    /// whose storage is already empty was asked to free itself.
    DoubleFree,
    /// The pad canaries around a block were overwritten.
    PadViolation,
    /// A `SmartPointer` was dereferenced while its handle's storage was empty.
    DanglingAccess,
    /// `RemoveRef` drove a handle's reference count below zero.
    NegativeRefCount,
    /// A handle's reference count reached zero while its storage was still
    /// non-empty (explicit free was skipped before the last reference dropped).
    DanglingReference,
    /// The pool returned a non-`Ok` status for a `SmartPointer`-initiated free.
    InvalidFree,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidAlignment => f.write_str("invalid alignment on free"),
            PoolError::DoubleFree => f.write_str("attempt to free already freed memory"),
            PoolError::PadViolation => f.write_str("pad bytes invalidated"),
            PoolError::DanglingAccess => f.write_str("attempt to access freed memory"),
            PoolError::NegativeRefCount => f.write_str("negative refcount detected"),
            PoolError::DanglingReference => {
                f.write_str("handle refcount reached zero with storage still present")
            }
            PoolError::InvalidFree => f.write_str("invalid free attempt"),
        }
    }
}

impl std::error::Error for PoolError {}
