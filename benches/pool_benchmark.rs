//! Throughput of raw allocate/free traffic against the general-purpose
//! allocator, at a few pool shapes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use poolguard::{Callsite, PoolAllocator, PoolConfig};

fn cs() -> Callsite {
    poolguard::callsite!()
}

fn allocate_free_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_free_cycle");
    for blocks_per_page in [64usize, 1024, 4096] {
        let pool: PoolAllocator<u64> =
            PoolAllocator::new(PoolConfig::new().with_blocks_per_page(blocks_per_page));
        group.bench_with_input(
            BenchmarkId::from_parameter(blocks_per_page),
            &blocks_per_page,
            |b, _| {
                b.iter(|| {
                    let addr = pool.allocate(cs());
                    black_box(pool.free(addr, cs()));
                });
            },
        );
    }
    group.finish();
}

fn sustained_allocation(c: &mut Criterion) {
    c.bench_function("sustained_allocation_1024_live", |b| {
        let pool: PoolAllocator<u64> = PoolAllocator::new(PoolConfig::new());
        b.iter(|| {
            let live: Vec<_> = (0..1024).map(|_| pool.allocate(cs())).collect();
            for addr in live {
                black_box(pool.free(addr, cs()));
            }
        });
    });
}

criterion_group!(benches, allocate_free_cycle, sustained_allocation);
criterion_main!(benches);
