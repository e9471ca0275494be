//! Source-position capture for allocation/free diagnostics.

use core::fmt;

/// A source file + line pair captured at an `Allocate`/`Free` call site.
///
/// Cheap to pass by value; `file` is the `&'static str` produced by `file!()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Callsite {
    /// The source file the call was made from.
    pub file: &'static str,
    /// The line within `file`.
    pub line: u32,
}

impl Callsite {
    /// Builds a `Callsite` from a raw file/line pair. Prefer [`callsite!`].
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// A placeholder callsite used for handles/blocks that have no recorded
    /// origin (e.g. the process-wide Null Handle).
    pub const UNKNOWN: Self = Self::new("<unknown>", 0);
}

impl Default for Callsite {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for Callsite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.file, self.line)
    }
}

/// Captures the current source file and line as a [`Callsite`].
#[macro_export]
macro_rules! callsite {
    () => {
        $crate::Callsite::new(file!(), line!())
    };
}
