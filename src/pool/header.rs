//! Per-block debug header.

use crate::Callsite;

/// One header per block, present only when the `debug` feature is enabled.
///
/// Cleared to all-zero (`allocated = false`, callsite = `("", 0)`) when the
/// block it describes is free.
#[cfg(feature = "debug")]
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DebugHeader {
    pub allocated: bool,
    pub callsite: Callsite,
}

#[cfg(feature = "debug")]
impl DebugHeader {
    pub const EMPTY: Self = Self {
        allocated: false,
        callsite: Callsite::new("", 0),
    };
}

#[cfg(feature = "debug")]
impl Default for DebugHeader {
    fn default() -> Self {
        Self::EMPTY
    }
}
