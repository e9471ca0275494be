//! Pool statistics, maintained only when the `debug` feature is enabled.
//!
//! These are plain counters, not atomics: the pool's single-threaded
//! contract (see the crate's concurrency notes) means there is never
//! concurrent access to race over.

/// Monotone counters and "in use" gauges for a pool.
#[cfg(feature = "debug")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub free_blocks: usize,
    pub blocks_in_use: usize,
    pub pages_in_use: usize,
    pub most_blocks_in_use: usize,
    pub most_pages_in_use: usize,
    pub allocations: u64,
    pub deallocations: u64,
}

#[cfg(feature = "debug")]
impl PoolStats {
    pub(crate) fn on_page_created(&mut self, blocks_per_page: usize) {
        self.free_blocks += blocks_per_page;
        self.pages_in_use += 1;
        self.most_pages_in_use = self.most_pages_in_use.max(self.pages_in_use);
    }

    pub(crate) fn on_allocate(&mut self) {
        self.allocations += 1;
        self.free_blocks -= 1;
        self.blocks_in_use += 1;
        self.most_blocks_in_use = self.most_blocks_in_use.max(self.blocks_in_use);
    }

    pub(crate) fn on_free(&mut self) {
        self.deallocations += 1;
        self.free_blocks += 1;
        self.blocks_in_use -= 1;
    }
}
