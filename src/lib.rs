//! A fixed-size object pool allocator with debug-mode poisoning, pad
//! canaries, and a reference-counted, dangling-detecting handle layer.
//!
//! Three subsystems, leaves first:
//!
//! - [`PoolAllocator`] — a typed free-list allocator over page-sized slabs.
//! - [`handle::Handle`] — a ref-counted indirection node, itself allocated
//!   from a self-hosted `PoolAllocator<Handle>`.
//! - [`SmartPointer`] — the user-facing, pointer-like owner of one handle
//!   reference.
//!
//! Single-threaded by design: see the handle module's documentation for why
//! the process-wide pools use an explicit `Sync` assertion rather than
//! atomics or locks.

pub mod callsite;
pub mod config;
pub mod error;
pub mod handle;
pub mod pool;
pub mod signature;
pub mod sink;
pub mod smart_pointer;

pub use callsite::Callsite;
pub use config::PoolConfig;
pub use error::{FreeStatus, PoolError};
pub use handle::Handle;
pub use pool::{ErasedPool, PoolAllocator};
pub use sink::LogSink;
pub use smart_pointer::{SmartPointer, UpcastTo};
