//! The typed free-list allocator.
//!
//! Grounded on this codebase's slab allocator: a `Vec` of owned pages, a
//! singly-linked free list threaded through block storage, and (behind the
//! `debug` feature) per-block headers, poison bytes, and running statistics.

mod header;
mod page;
mod stats;

#[cfg(feature = "debug")]
pub use header::DebugHeader;
#[cfg(feature = "debug")]
pub use stats::PoolStats;

use std::cell::{Cell, RefCell};
#[cfg(feature = "debug")]
use std::io;
use std::marker::PhantomData;
use std::mem;
#[cfg(feature = "debug")]
use std::path::Path;
use std::ptr::{self, NonNull};

use crate::callsite::Callsite;
use crate::config::PoolConfig;
use crate::error::FreeStatus;
#[cfg(feature = "debug")]
use crate::error::PoolError;
#[cfg(feature = "debug")]
use crate::signature;
use crate::sink::LogSink;

use page::{Geometry, Page};

#[cfg(feature = "debug")]
fn header_size() -> usize {
    mem::size_of::<DebugHeader>()
}

#[cfg(not(feature = "debug"))]
fn header_size() -> usize {
    0
}

/// Dispatch surface a [`crate::Handle`] uses to return a block to whichever
/// concrete `PoolAllocator<T>` allocated it, without the handle itself
/// needing to be generic over `T`.
///
/// Realizes the "small dispatch record `{ free_fn, pool_ptr }`" design note:
/// a `&'static dyn ErasedPool` plays the role of that record, with the
/// vtable pointer standing in for `free_fn`.
pub trait ErasedPool {
    #[doc(hidden)]
    fn free_erased(&self, addr: NonNull<u8>, callsite: Callsite) -> FreeStatus;
}

impl<T> ErasedPool for PoolAllocator<T> {
    fn free_erased(&self, addr: NonNull<u8>, callsite: Callsite) -> FreeStatus {
        self.free(addr, callsite)
    }
}

/// A fixed-block allocator for `T`, carving pages into `blocksPerPage`
/// blocks and threading a free list through them.
///
/// Not `Sync`: see the crate's concurrency notes for why a single-threaded
/// contract is load-bearing here rather than an oversight.
pub struct PoolAllocator<T> {
    config: PoolConfig,
    geometry: Geometry,
    pages: RefCell<Vec<Page>>,
    free_head: Cell<Option<NonNull<u8>>>,
    sink: LogSink,
    #[cfg(feature = "debug")]
    stats: RefCell<PoolStats>,
    _marker: PhantomData<T>,
}

impl<T> PoolAllocator<T> {
    /// A pool with no log sink; diagnostics are dropped.
    pub fn new(config: PoolConfig) -> Self {
        Self::with_sink(LogSink::None, config)
    }

    /// A pool that opens and owns `path` as its log sink, closing it on
    /// teardown.
    #[cfg(feature = "debug")]
    pub fn with_log_file(path: impl AsRef<Path>, config: PoolConfig) -> io::Result<Self> {
        Ok(Self::with_sink(LogSink::open_file(path)?, config))
    }

    /// A pool that writes diagnostics through a caller-owned sink; the pool
    /// never closes it.
    pub fn with_shared_sink(sink: LogSink, config: PoolConfig) -> Self {
        Self::with_sink(sink, config)
    }

    fn with_sink(sink: LogSink, config: PoolConfig) -> Self {
        let geometry = Geometry::new(
            mem::size_of::<T>(),
            header_size(),
            config.pad_bytes(),
            config.alignment(),
            config.blocks_per_page(),
        );
        Self {
            config,
            geometry,
            pages: RefCell::new(Vec::new()),
            free_head: Cell::new(None),
            sink,
            #[cfg(feature = "debug")]
            stats: RefCell::new(PoolStats::default()),
            _marker: PhantomData,
        }
    }

    /// Borrows `self` as the type-erased dispatch surface a `Handle` stores.
    /// Requires a `'static` pool: process-wide pools (statics, or leaked
    /// boxes) are the intended usage, per this pool's self-hosted-Handle
    /// design.
    pub fn as_erased(&'static self) -> &'static dyn ErasedPool {
        self
    }

    /// Allocates one block, poisoning it `ALLOCATED` and recording
    /// `callsite` in its header (debug only). Creates a new page first if
    /// the free list is empty.
    pub fn allocate(&self, callsite: Callsite) -> NonNull<u8> {
        let addr = match self.pop_free() {
            Some(addr) => addr,
            None => {
                self.create_page();
                self.pop_free().expect("page just created has free blocks")
            }
        };

        #[cfg(feature = "debug")]
        {
            unsafe { ptr::write_bytes(addr.as_ptr(), signature::ALLOCATED, self.geometry.block_size) };
            unsafe {
                *self.header_ptr(addr.as_ptr()) = DebugHeader {
                    allocated: true,
                    callsite,
                };
            }
            self.stats.borrow_mut().on_allocate();
        }
        #[cfg(not(feature = "debug"))]
        {
            let _ = callsite;
        }

        addr
    }

    /// Validates and frees `addr`, previously returned by [`Self::allocate`].
    ///
    /// Validation order: alignment, then (debug only) double-free, then
    /// (debug only) pad canaries. See the crate's external-interface notes
    /// for the exact diagnostic strings this can write to the log sink.
    pub fn free(&self, addr: NonNull<u8>, callsite: Callsite) -> FreeStatus {
        let page_base = self.page_base_of(addr.as_ptr());
        let d = addr.as_ptr() as usize - page_base;
        let left_offset = self.geometry.left_chunk_size - self.geometry.pad_bytes - self.geometry.block_size;
        let aligned = (d as isize - left_offset as isize).rem_euclid(self.geometry.inter_chunk_size as isize) == 0;

        if !aligned {
            #[cfg(feature = "debug")]
            {
                self.emit(format!(
                    "Invalid alignment on free from #{} in file {}",
                    callsite.line, callsite.file
                ));
                self.raise(PoolError::InvalidAlignment);
            }
            return FreeStatus::Align;
        }

        #[cfg(feature = "debug")]
        {
            let header = unsafe { &mut *self.header_ptr(addr.as_ptr()) };
            if !header.allocated {
                self.emit(format!(
                    "Attempt to free already freed memory from #{} in file {}",
                    callsite.line, callsite.file
                ));
                self.raise(PoolError::DoubleFree);
                return FreeStatus::Freed;
            }
            if !self.pads_intact(addr.as_ptr()) {
                self.emit(format!(
                    "Pad bytes invalidated for object allocated at #{} in file {}",
                    header.callsite.line, header.callsite.file
                ));
                self.raise(PoolError::PadViolation);
                return FreeStatus::Pad;
            }
            header.allocated = false;
            header.callsite = Callsite::UNKNOWN;
            unsafe { ptr::write_bytes(addr.as_ptr(), signature::FREED, self.geometry.block_size) };
            self.stats.borrow_mut().on_free();
        }

        self.push_free(addr);
        FreeStatus::Ok
    }

    /// The header describing the block at `addr`. `addr` must be a live
    /// block address previously returned by [`Self::allocate`].
    #[cfg(feature = "debug")]
    pub fn debug_header(&self, addr: NonNull<u8>) -> DebugHeader {
        unsafe { *self.header_ptr(addr.as_ptr()) }
    }

    /// Writes one leak-report line per still-allocated block to the sink,
    /// in page-then-slot order.
    #[cfg(feature = "debug")]
    pub fn dump_memory_in_use(&self) {
        let pages = self.pages.borrow();
        for page in pages.iter() {
            for i in 0..self.config.blocks_per_page() {
                let header_off = self.geometry.header_offset(i);
                let header = unsafe { &*(page.base().add(header_off) as *const DebugHeader) };
                if header.allocated {
                    self.sink.write_line(&format!(
                        "{}b allocated at line #{} in file {}",
                        self.geometry.block_size, header.callsite.line, header.callsite.file
                    ));
                }
            }
        }
    }

    /// Current statistics snapshot.
    #[cfg(feature = "debug")]
    pub fn stats(&self) -> PoolStats {
        *self.stats.borrow()
    }

    /// The sink this pool writes diagnostics to. Shared with the handle and
    /// smart-pointer layers so that a `Handle`-level diagnostic (e.g. a
    /// negative refcount) routes through the same sink as the pool it
    /// concerns.
    #[cfg(feature = "debug")]
    pub(crate) fn diagnostic_sink(&self) -> &LogSink {
        &self.sink
    }

    fn create_page(&self) {
        let (page, blocks) = Page::new(&self.geometry, self.config.blocks_per_page());
        self.pages.borrow_mut().push(page);
        for b in blocks {
            self.push_free(unsafe { NonNull::new_unchecked(b) });
        }
        #[cfg(feature = "debug")]
        self.stats.borrow_mut().on_page_created(self.config.blocks_per_page());
    }

    fn pop_free(&self) -> Option<NonNull<u8>> {
        let head = self.free_head.get()?;
        let next = unsafe { (head.as_ptr() as *const *mut u8).read_unaligned() };
        self.free_head.set(NonNull::new(next));
        Some(head)
    }

    fn push_free(&self, addr: NonNull<u8>) {
        let next = self.free_head.get().map_or(ptr::null_mut(), NonNull::as_ptr);
        unsafe { (addr.as_ptr() as *mut *mut u8).write_unaligned(next) };
        self.free_head.set(Some(addr));
    }

    fn page_base_of(&self, addr: *mut u8) -> usize {
        let pages = self.pages.borrow();
        pages
            .iter()
            .find(|p| p.contains(addr))
            .map(|p| p.base() as usize)
            .expect("free: address does not belong to this pool")
    }

    #[cfg(feature = "debug")]
    fn header_ptr(&self, block_addr: *mut u8) -> *mut DebugHeader {
        unsafe { block_addr.sub(self.geometry.pad_bytes + self.geometry.header_size) as *mut DebugHeader }
    }

    #[cfg(feature = "debug")]
    fn pads_intact(&self, block_addr: *mut u8) -> bool {
        if self.geometry.pad_bytes == 0 {
            return true;
        }
        unsafe {
            let left = std::slice::from_raw_parts(block_addr.sub(self.geometry.pad_bytes), self.geometry.pad_bytes);
            let right =
                std::slice::from_raw_parts(block_addr.add(self.geometry.block_size), self.geometry.pad_bytes);
            left.iter().all(|&b| b == signature::PAD) && right.iter().all(|&b| b == signature::PAD)
        }
    }

    #[cfg(feature = "debug")]
    fn emit(&self, line: String) {
        #[cfg(feature = "tracing")]
        tracing::warn!(target: "poolguard::pool", %line);
        self.sink.write_line(&line);
    }

    #[cfg(feature = "debug")]
    fn raise(&self, err: PoolError) {
        #[cfg(feature = "exceptions")]
        panic!("{err}");
        #[cfg(not(feature = "exceptions"))]
        {
            let _ = err;
        }
    }
}

impl<T> Drop for PoolAllocator<T> {
    fn drop(&mut self) {
        #[cfg(feature = "debug")]
        if self.sink.is_some() {
            self.dump_memory_in_use();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs() -> Callsite {
        crate::callsite!()
    }

    #[test]
    fn allocate_free_cycle_restores_free_list() {
        let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new());
        let addr = pool.allocate(cs());
        assert_eq!(addr.as_ptr() as usize % 4, 0);
        let status = pool.free(addr, cs());
        assert_eq!(status, FreeStatus::Ok);
    }

    #[test]
    fn misaligned_free_reports_align() {
        let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new());
        let addr = pool.allocate(cs());
        let shifted = unsafe { NonNull::new_unchecked(addr.as_ptr().add(1)) };
        assert_eq!(pool.free(shifted, cs()), FreeStatus::Align);
    }

    #[cfg(feature = "debug")]
    #[test]
    fn double_free_reports_freed() {
        let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new());
        let addr = pool.allocate(cs());
        assert_eq!(pool.free(addr, cs()), FreeStatus::Ok);
        assert_eq!(pool.free(addr, cs()), FreeStatus::Freed);
    }

    #[cfg(feature = "debug")]
    #[test]
    fn pad_overrun_detected_on_free() {
        let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new().with_pad_bytes(2));
        let addr = pool.allocate(cs());
        unsafe { *addr.as_ptr().sub(1) = 0x00 };
        assert_eq!(pool.free(addr, cs()), FreeStatus::Pad);
    }

    #[cfg(feature = "debug")]
    #[test]
    fn stats_track_blocks_in_use() {
        let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new().with_blocks_per_page(4));
        let a = pool.allocate(cs());
        let b = pool.allocate(cs());
        assert_eq!(pool.stats().blocks_in_use, 2);
        pool.free(a, cs());
        pool.free(b, cs());
        assert_eq!(pool.stats().blocks_in_use, 0);
        assert_eq!(pool.stats().allocations, 2);
        assert_eq!(pool.stats().deallocations, 2);
    }
}
