//! Reference-counted, dangling-detecting indirection nodes.
//!
//! A `Handle` is itself allocated from a process-wide `PoolAllocator<Handle>`
//! (the self-hosted design note): creating a `Handle` means carving one
//! block out of that pool, and a `Handle` whose refcount drops to zero
//! returns that same block. The global pool and the shared Null Handle use
//! this codebase's lazy-static-singleton idiom (`OnceLock`), wrapped in a
//! `Sync` shim since a `Cell`/`RefCell`-based pool is otherwise `!Sync` and
//! this crate's single-threaded contract makes that safe to assert by hand
//! — the same shim this codebase uses for single-threaded channel state.

use std::any::TypeId;
use std::cell::Cell;
use std::ptr::NonNull;
use std::sync::OnceLock;

use crate::callsite::Callsite;
use crate::config::PoolConfig;
#[cfg(feature = "debug")]
use crate::error::PoolError;
use crate::pool::{ErasedPool, PoolAllocator};

/// Wraps a value that is not `Sync` and asserts, by construction, that it
/// will only ever be touched from one thread. See the module docs.
struct AssertSync<T>(T);

unsafe impl<T> Sync for AssertSync<T> {}

static HANDLE_POOL: OnceLock<AssertSync<PoolAllocator<Handle>>> = OnceLock::new();
static NULL_HANDLE: OnceLock<AssertSync<Handle>> = OnceLock::new();

fn handle_pool() -> &'static PoolAllocator<Handle> {
    &HANDLE_POOL
        .get_or_init(|| AssertSync(PoolAllocator::new(PoolConfig::new())))
        .0
}

/// The process-wide shared null handle: `storage = None`, and a permanent
/// sentinel unit of refcount that is never removed, so it is never
/// collected no matter how many `SmartPointer`s wrap and release it.
pub fn null_handle() -> &'static Handle {
    &NULL_HANDLE
        .get_or_init(|| {
            AssertSync(Handle {
                storage: Cell::new(None),
                pool: Cell::new(None),
                ref_count: Cell::new(1),
                callsite: Cell::new(Callsite::UNKNOWN),
                type_id: Cell::new(TypeId::of::<()>()),
            })
        })
        .0
}

/// A ref-counted node naming one block in some `PoolAllocator<T>`.
///
/// Invariants upheld by this type: `ref_count >= 0` whenever a `Handle` is
/// reachable, and `ref_count == 0 => storage.is_none()`. See
/// [`Handle::remove_ref`] for the diagnostics raised when a caller violates
/// the second invariant (freeing storage too late, i.e. dropping the last
/// reference while the payload is still live).
pub struct Handle {
    storage: Cell<Option<NonNull<u8>>>,
    pool: Cell<Option<&'static dyn ErasedPool>>,
    ref_count: Cell<i64>,
    callsite: Cell<Callsite>,
    type_id: Cell<TypeId>,
}

impl Handle {
    /// Allocates a `Handle` from the shared handle pool with `ref_count = 0`
    /// recording `pool`, `storage`, and the concrete type `storage` points
    /// at (used later by `dyn_cast`). The caller (a `SmartPointer`
    /// constructor) is responsible for the first `add_ref`.
    pub fn create<T: 'static>(
        pool: &'static dyn ErasedPool,
        storage: NonNull<u8>,
        callsite: Callsite,
    ) -> &'static Handle {
        let block = handle_pool().allocate(crate::callsite!());
        let slot = block.as_ptr() as *mut Handle;
        unsafe {
            slot.write(Handle {
                storage: Cell::new(Some(storage)),
                pool: Cell::new(Some(pool)),
                ref_count: Cell::new(0),
                callsite: Cell::new(callsite),
                type_id: Cell::new(TypeId::of::<T>()),
            });
            &*slot
        }
    }

    /// The `TypeId` of the concrete payload type this handle was created
    /// for; used by `SmartPointer::dyn_cast`.
    pub fn type_id(&self) -> TypeId {
        self.type_id.get()
    }

    /// The handle naming no storage and no pool: used by `SmartPointer`'s
    /// default construction and null rebinds.
    pub fn null() -> &'static Handle {
        null_handle()
    }

    /// True if this is the shared null handle.
    pub fn is_null(&self) -> bool {
        std::ptr::eq(self, null_handle())
    }

    /// Current storage address, if the payload has not been explicitly
    /// freed.
    pub fn storage(&self) -> Option<NonNull<u8>> {
        self.storage.get()
    }

    /// Clears `storage` without touching `ref_count`; used by `Free`, which
    /// decrements separately.
    pub fn clear_storage(&self) {
        self.storage.set(None);
    }

    /// The callsite this handle (or its storage) was originally allocated
    /// at, used to annotate diagnostics.
    pub fn callsite(&self) -> Callsite {
        self.callsite.get()
    }

    /// The pool that owns this handle's storage, if any (the null handle
    /// has none).
    pub fn pool(&self) -> Option<&'static dyn ErasedPool> {
        self.pool.get()
    }

    /// Increments the reference count.
    pub fn add_ref(&self) {
        self.ref_count.set(self.ref_count.get() + 1);
    }

    /// Decrements the reference count. If it goes negative, or reaches zero
    /// while `storage` is still present, a diagnostic is emitted (and, under
    /// the `exceptions` feature, raised). Once the count is `<= 0` the
    /// handle returns itself to the handle pool — after this call returns,
    /// `self` must not be touched again.
    pub fn remove_ref(&self, callsite: Callsite) {
        let new_count = self.ref_count.get() - 1;
        self.ref_count.set(new_count);

        #[cfg(feature = "debug")]
        {
            if new_count < 0 {
                self.diagnose(
                    format!(
                        "[Handle]: Negative RefCount detected from remove at: {} #{}Memory allocated at: {} #{}",
                        callsite.file,
                        callsite.line,
                        self.callsite.get().file,
                        self.callsite.get().line
                    ),
                    PoolError::NegativeRefCount,
                );
            } else if new_count <= 0 && self.storage.get().is_some() {
                self.diagnose(
                    format!(
                        "[Handle]: Dangling reference: refcount reached zero with storage still present. Memory allocated at: {} #{}",
                        self.callsite.get().file,
                        self.callsite.get().line
                    ),
                    PoolError::DanglingReference,
                );
            }
        }
        #[cfg(not(feature = "debug"))]
        let _ = callsite;

        if new_count <= 0 {
            self.return_to_pool();
        }
    }

    #[cfg(feature = "debug")]
    fn diagnose(&self, line: String, err: PoolError) {
        handle_pool().diagnostic_sink().write_line(&line);
        #[cfg(feature = "tracing")]
        tracing::warn!(target: "poolguard::handle", %line);
        #[cfg(feature = "exceptions")]
        panic!("{err}");
        #[cfg(not(feature = "exceptions"))]
        {
            let _ = err;
        }
    }

    /// Returns this handle's own block to the handle pool. Only ever called
    /// once `ref_count <= 0`; the null handle never reaches this path
    /// because its permanent sentinel unit keeps its count at 1.
    fn return_to_pool(&self) {
        let addr = unsafe { NonNull::new_unchecked(self as *const Handle as *mut u8) };
        handle_pool().free(addr, Callsite::UNKNOWN);
    }
}
