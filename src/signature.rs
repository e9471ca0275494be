//! Poison byte signatures written over block storage in debug builds.
//!
//! Each constant also doubles as the corresponding [`crate::error::FreeStatus`]
//! discriminant for the failure it signals, so a raw byte observed in a core
//! dump and a `FreeStatus` value seen in a test assertion are the same number.

/// Written over a block immediately after it is handed out by `Allocate`.
pub const ALLOCATED: u8 = 0xAA;
/// Written over a block immediately after it is returned by `Free`.
pub const FREED: u8 = 0xBB;
/// Written into pad bytes surrounding a block.
pub const PAD: u8 = 0xDD;
/// Written into inter-chunk / leading alignment filler.
pub const ALIGN: u8 = 0xEE;
/// Written over a block that has never been allocated since its page was created.
pub const UNALLOCATED: u8 = 0xFF;
