//! Pool construction settings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of blocks carved from each freshly created page.
pub const DEFAULT_BLOCKS_PER_PAGE: usize = 1024;
/// Default pad-canary width on each side of a block, in debug builds.
#[cfg(feature = "debug")]
pub const DEFAULT_PAD_BYTES: usize = 2;
/// Default pad-canary width on each side of a block, in release builds.
#[cfg(not(feature = "debug"))]
pub const DEFAULT_PAD_BYTES: usize = 0;
/// Default required alignment of a block's first byte.
pub const DEFAULT_ALIGNMENT: usize = 4;

/// Immutable-after-construction tuning knobs for a [`PoolAllocator`](crate::PoolAllocator).
///
/// Built fluently:
///
/// ```
/// use poolguard::PoolConfig;
///
/// let cfg = PoolConfig::new().with_blocks_per_page(256).with_alignment(8);
/// assert_eq!(cfg.blocks_per_page(), 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    blocks_per_page: usize,
    pad_bytes: usize,
    alignment: usize,
}

impl PoolConfig {
    /// Starts a new configuration from the documented defaults.
    pub const fn new() -> Self {
        Self {
            blocks_per_page: DEFAULT_BLOCKS_PER_PAGE,
            pad_bytes: DEFAULT_PAD_BYTES,
            alignment: DEFAULT_ALIGNMENT,
        }
    }

    /// Sets the number of blocks carved from each page. Must be at least 1.
    #[must_use]
    pub const fn with_blocks_per_page(mut self, n: usize) -> Self {
        assert!(n >= 1, "blocks_per_page must be at least 1");
        self.blocks_per_page = n;
        self
    }

    /// Sets the pad-canary width on each side of a block. Ignored (treated as
    /// 0) unless the `debug` feature is enabled.
    #[must_use]
    pub const fn with_pad_bytes(mut self, n: usize) -> Self {
        self.pad_bytes = n;
        self
    }

    /// Sets the required alignment of each block's first byte. Must be a
    /// power of two.
    #[must_use]
    pub const fn with_alignment(mut self, n: usize) -> Self {
        assert!(n >= 1 && n.is_power_of_two(), "alignment must be a power of two");
        self.alignment = n;
        self
    }

    /// The configured blocks-per-page.
    pub const fn blocks_per_page(&self) -> usize {
        self.blocks_per_page
    }

    /// The configured pad-canary width (0 outside the `debug` feature).
    pub const fn pad_bytes(&self) -> usize {
        #[cfg(feature = "debug")]
        {
            self.pad_bytes
        }
        #[cfg(not(feature = "debug"))]
        {
            0
        }
    }

    /// The configured alignment.
    pub const fn alignment(&self) -> usize {
        self.alignment
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
