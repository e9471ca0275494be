//! End-to-end scenarios exercising the pool/handle/smart-pointer stack
//! together, mirroring the concrete walkthroughs this crate's design is
//! checked against.

use poolguard::{Callsite, FreeStatus, PoolAllocator, PoolConfig, SmartPointer};

fn cs() -> Callsite {
    poolguard::callsite!()
}

#[test]
fn allocate_free_cycle() {
    let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new());
    let addr = pool.allocate(cs());
    assert_eq!(addr.as_ptr() as usize % 4, 0);

    let status = pool.free(addr, cs());
    assert_eq!(status, FreeStatus::Ok);

    #[cfg(feature = "debug")]
    {
        let stats = pool.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.deallocations, 1);
        assert_eq!(stats.blocks_in_use, 0);
        assert_eq!(stats.free_blocks, 1024);
    }
}

#[cfg(feature = "debug")]
#[test]
fn double_free_reports_freed_and_leaves_blocks_in_use_unchanged() {
    let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new());
    let addr = pool.allocate(cs());
    assert_eq!(pool.free(addr, cs()), FreeStatus::Ok);
    assert_eq!(pool.stats().blocks_in_use, 0);

    assert_eq!(pool.free(addr, cs()), FreeStatus::Freed);
    assert_eq!(pool.stats().blocks_in_use, 0);
}

#[test]
fn misaligned_free_returns_align() {
    let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new());
    let addr = pool.allocate(cs());
    let shifted = unsafe { std::ptr::NonNull::new_unchecked(addr.as_ptr().add(1)) };
    assert_eq!(pool.free(shifted, cs()), FreeStatus::Align);
}

#[cfg(feature = "debug")]
#[test]
fn pad_overrun_is_detected_on_free() {
    let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new().with_pad_bytes(2));
    let addr = pool.allocate(cs());
    unsafe { *addr.as_ptr().sub(1) = 0x00 };
    assert_eq!(pool.free(addr, cs()), FreeStatus::Pad);
}

#[cfg(feature = "debug")]
#[test]
#[should_panic]
fn handle_lifecycle_dangling_access_panics_in_debug() {
    let pool: &'static PoolAllocator<u64> = Box::leak(Box::new(PoolAllocator::new(PoolConfig::new())));
    let first = SmartPointer::new(pool, 11u64, cs());
    let second = first.clone();
    let mut first = first;
    first.free(cs());
    let _ = *second;
}

#[cfg(feature = "debug")]
#[test]
fn leak_dump_counts_only_surviving_allocations() {
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Buf(Vec<u8>);
    impl std::io::Write for Buf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(data);
            Ok(data.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let concrete: Rc<RefCell<Buf>> = Rc::new(RefCell::new(Buf::default()));
    let erased: Rc<RefCell<dyn std::io::Write>> = concrete.clone();
    {
        let pool: PoolAllocator<u64> =
            PoolAllocator::with_shared_sink(poolguard::LogSink::shared(erased), PoolConfig::new());
        let a = pool.allocate(cs());
        let _b = pool.allocate(cs());
        let _c = pool.allocate(cs());
        pool.free(a, cs());
    }

    let contents = String::from_utf8(concrete.borrow().0.clone()).unwrap();
    let leak_lines = contents.lines().filter(|l| l.contains("allocated at line")).count();
    assert_eq!(leak_lines, 2);
}
