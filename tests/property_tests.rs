//! Property-based checks of the pool's core invariants across random
//! allocate/free traffic.

use poolguard::{Callsite, FreeStatus, PoolAllocator, PoolConfig};
use proptest::prelude::*;

fn cs() -> Callsite {
    poolguard::callsite!()
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Allocate,
    Free(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Allocate),
        2 => (0usize..64).prop_map(Op::Free),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn free_blocks_plus_blocks_in_use_matches_pages(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new().with_blocks_per_page(8));
        let mut live = Vec::new();

        for op in ops {
            match op {
                Op::Allocate => live.push(pool.allocate(cs())),
                Op::Free(idx) => {
                    if !live.is_empty() {
                        let addr = live.swap_remove(idx % live.len());
                        pool.free(addr, cs());
                    }
                }
            }

            #[cfg(feature = "debug")]
            {
                let stats = pool.stats();
                prop_assert_eq!(stats.free_blocks + stats.blocks_in_use, stats.pages_in_use * 8);
                prop_assert!(stats.most_blocks_in_use >= stats.blocks_in_use);
                prop_assert!(stats.most_pages_in_use >= stats.pages_in_use);
                prop_assert_eq!(stats.allocations - stats.deallocations, stats.blocks_in_use as u64);
            }
        }
    }

    #[test]
    fn allocate_then_free_always_succeeds_once(_seed in 0u32..1) {
        let pool: PoolAllocator<u32> = PoolAllocator::new(PoolConfig::new());
        let addr = pool.allocate(cs());
        prop_assert_eq!(pool.free(addr, cs()), FreeStatus::Ok);
    }
}
