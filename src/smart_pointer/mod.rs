//! The user-facing, pointer-like owner of one `Handle` reference.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::callsite::Callsite;
#[cfg(feature = "debug")]
use crate::error::PoolError;
use crate::handle::Handle;
use crate::pool::ErasedPool;

/// Compile-time witness that a `SmartPointer<Self>` may be rebound as a
/// `SmartPointer<U>` — the "type-relation witness" design note standing in
/// for a `U*`-from-`T*` conversion check. Implement it for pairs of types
/// related the way the host type hierarchy would allow an implicit upcast.
pub trait UpcastTo<U> {}

/// Owns exactly one reference on one [`Handle`] at all times, including
/// while pointing at the shared null handle.
pub struct SmartPointer<T> {
    handle: &'static Handle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SmartPointer<T> {
    /// References the null handle, taking a reference on it.
    pub fn null() -> Self {
        let handle = Handle::null();
        handle.add_ref();
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    /// Wraps an already-created handle, taking a reference on it. Used by
    /// the pool-allocation helper that constructs the handle in the first
    /// place.
    pub fn from_handle(handle: &'static Handle) -> Self {
        handle.add_ref();
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    /// Allocates `value` from `pool`, wraps it in a fresh handle, and
    /// returns a `SmartPointer` holding the first reference to that handle.
    pub fn new(pool: &'static dyn ErasedPoolFor<T>, value: T, callsite: Callsite) -> Self
    where
        T: 'static,
    {
        let storage = pool.allocate_erased(callsite);
        unsafe { (storage.as_ptr() as *mut T).write(value) };
        let handle = Handle::create::<T>(pool.as_erased_pool(), storage, callsite);
        Self::from_handle(handle)
    }

    /// True if the handle's storage has been explicitly freed (or this is a
    /// null pointer).
    pub fn is_null(&self) -> bool {
        self.handle.storage().is_none()
    }

    /// The handle this pointer currently references. Exposed so sibling
    /// `SmartPointer<U>` instances can compare or rebind against it.
    pub fn handle(&self) -> &'static Handle {
        self.handle
    }

    /// Rebinds to `handle`, adjusting reference counts on both the old and
    /// new handle.
    fn rebind(&mut self, handle: &'static Handle, callsite: Callsite) {
        handle.add_ref();
        self.handle.remove_ref(callsite);
        self.handle = handle;
    }

    /// Sets this pointer to null, releasing its current reference.
    pub fn set_null(&mut self, callsite: Callsite) {
        self.rebind(Handle::null(), callsite);
    }

    /// Rebinds as a `SmartPointer<U>` sharing the same handle, gated at
    /// compile time by [`UpcastTo`].
    pub fn as_cast<U>(&self) -> SmartPointer<U>
    where
        T: UpcastTo<U>,
    {
        self.handle.add_ref();
        SmartPointer {
            handle: self.handle,
            _marker: PhantomData,
        }
    }

    /// Runtime-checked cast: succeeds (sharing the handle) only if the
    /// handle's payload was originally created as a `U`; otherwise returns a
    /// null `SmartPointer<U>`.
    pub fn dyn_cast<U: 'static>(&self) -> SmartPointer<U> {
        if self.handle.type_id() == TypeId::of::<U>() {
            self.handle.add_ref();
            SmartPointer {
                handle: self.handle,
                _marker: PhantomData,
            }
        } else {
            SmartPointer::null()
        }
    }

    /// Explicitly frees the payload and rebinds to null.
    ///
    /// If storage is already empty, this is a double-free: a diagnostic is
    /// emitted (and, under `exceptions`, raised) and the call is otherwise a
    /// no-op besides the null rebind. Otherwise the pool's `Free` is
    /// invoked; a non-`Ok` status is diagnosed as `InvalidFree`. In either
    /// case storage is cleared, the old handle's reference is released, and
    /// this pointer is rebound to the null handle with a fresh reference.
    pub fn free(&mut self, callsite: Callsite) {
        match self.handle.storage() {
            None => {
                #[cfg(feature = "debug")]
                self.diagnose_double_free(callsite);
            }
            Some(storage) => {
                if let Some(pool) = self.handle.pool() {
                    let status = pool.free_erased(storage, callsite);
                    #[cfg(feature = "debug")]
                    if !status.is_ok() {
                        self.diagnose_invalid_free(callsite);
                    }
                    #[cfg(not(feature = "debug"))]
                    let _ = status;
                }
                self.handle.clear_storage();
            }
        }
        self.set_null(callsite);
    }

    #[cfg(feature = "debug")]
    fn diagnose_double_free(&self, callsite: Callsite) {
        let h = self.handle.callsite();
        let line = format!(
            "[Handle]: Attempt to free freed memory. Free attempt at: {} #{}Memory allocated at: {} #{}",
            callsite.file, callsite.line, h.file, h.line
        );
        emit(&line, PoolError::DoubleFree);
    }

    #[cfg(feature = "debug")]
    fn diagnose_invalid_free(&self, callsite: Callsite) {
        let h = self.handle.callsite();
        let line = format!(
            "[Handle]: Invalid free attempt failed at: {} #{}Memory allocated at: {} #{}",
            callsite.file, callsite.line, h.file, h.line
        );
        emit(&line, PoolError::InvalidFree);
    }
}

#[cfg(feature = "debug")]
fn emit(line: &str, err: PoolError) {
    #[cfg(feature = "tracing")]
    tracing::warn!(target: "poolguard::smart_pointer", %line);
    let _ = line;
    #[cfg(feature = "exceptions")]
    panic!("{err}");
    #[cfg(not(feature = "exceptions"))]
    {
        let _ = err;
    }
}

/// A pool that can allocate and dangling-check-dereference a `T`, exposed
/// to `SmartPointer::new`/`Deref` without requiring `SmartPointer` itself to
/// be generic over the pool's own type parameter.
pub trait ErasedPoolFor<T> {
    fn allocate_erased(&'static self, callsite: Callsite) -> NonNull<u8>;
    fn as_erased_pool(&'static self) -> &'static dyn ErasedPool;
}

impl<T> ErasedPoolFor<T> for crate::pool::PoolAllocator<T> {
    fn allocate_erased(&'static self, callsite: Callsite) -> NonNull<u8> {
        self.allocate(callsite)
    }

    fn as_erased_pool(&'static self) -> &'static dyn ErasedPool {
        self.as_erased()
    }
}

impl<T> Default for SmartPointer<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Clone for SmartPointer<T> {
    /// Copy semantics: references the same handle, taking another
    /// reference. Move is not specialized — the source remains valid and
    /// holds its own reference, matching the non-stealing move this type is
    /// grounded on.
    fn clone(&self) -> Self {
        Self::from_handle(self.handle)
    }
}

impl<T> PartialEq for SmartPointer<T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.handle, other.handle)
    }
}

impl<T> Eq for SmartPointer<T> {}

impl<T> Deref for SmartPointer<T> {
    type Target = T;

    /// Dereferences the payload. If storage is empty (dangling), emits a
    /// diagnostic citing the handle's original allocation site and, under
    /// `exceptions`, panics; without that feature this is a logic error
    /// left to the caller (see this crate's release-mode contract).
    fn deref(&self) -> &T {
        match self.handle.storage() {
            Some(storage) => unsafe { &*(storage.as_ptr() as *const T) },
            None => {
                #[cfg(feature = "debug")]
                self.diagnose_dangling_access();
                panic!("SmartPointer: dereferenced a handle with no storage");
            }
        }
    }
}

impl<T> DerefMut for SmartPointer<T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.handle.storage() {
            Some(storage) => unsafe { &mut *(storage.as_ptr() as *mut T) },
            None => {
                #[cfg(feature = "debug")]
                self.diagnose_dangling_access();
                panic!("SmartPointer: dereferenced a handle with no storage");
            }
        }
    }
}

impl<T> SmartPointer<T> {
    #[cfg(feature = "debug")]
    fn diagnose_dangling_access(&self) {
        let h = self.handle.callsite();
        let line = format!(
            "[Handle]: Attempt to access freed memory. Memory allocated at {} #{}",
            h.file, h.line
        );
        emit(&line, PoolError::DanglingAccess);
    }
}

impl<T> Drop for SmartPointer<T> {
    fn drop(&mut self) {
        self.handle.remove_ref(Callsite::UNKNOWN);
    }
}

impl<T> fmt::Debug for SmartPointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartPointer")
            .field("is_null", &self.is_null())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::pool::PoolAllocator;

    fn cs() -> Callsite {
        crate::callsite!()
    }

    fn leaked_pool() -> &'static PoolAllocator<u64> {
        Box::leak(Box::new(PoolAllocator::new(PoolConfig::new())))
    }

    #[test]
    fn default_smart_pointer_is_null() {
        let p: SmartPointer<u64> = SmartPointer::default();
        assert!(p.is_null());
    }

    #[test]
    fn clone_shares_handle_and_bumps_refcount() {
        let pool = leaked_pool();
        let p = SmartPointer::new(pool, 42u64, cs());
        let q = p.clone();
        assert_eq!(p, q);
        assert_eq!(*p, 42);
        assert_eq!(*q, 42);
    }

    #[test]
    fn free_rebinds_to_null_and_releases_storage() {
        let pool = leaked_pool();
        let mut p = SmartPointer::new(pool, 7u64, cs());
        p.free(cs());
        assert!(p.is_null());
    }
}
