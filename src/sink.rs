//! The pool's log sink: an opaque byte-stream diagnostics and the leak
//! report are written to.
//!
//! The wire format is a contract with external tooling (see the pool, handle,
//! and smart-pointer modules for the exact strings) and must never be
//! rerouted through a structured logger; the optional `tracing` feature adds
//! a separate, purely observational layer alongside it rather than replacing
//! it.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

/// Where a pool's diagnostic lines and leak dump are written.
pub enum LogSink {
    /// No sink configured; diagnostics are dropped on the floor (still
    /// subject to the `exceptions` feature's panics).
    None,
    /// A file the pool opened itself via [`LogSink::open_file`]; closed when
    /// the pool tears down.
    Owned(File),
    /// A writer the caller supplied and retains its own ownership of; the
    /// pool writes through it but never closes it on the caller's behalf.
    Shared(Rc<RefCell<dyn Write>>),
}

impl LogSink {
    /// Opens (creating/truncating) the file at `path` as an owned sink.
    pub fn open_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::Owned(File::create(path)?))
    }

    /// Wraps a caller-supplied writer as a non-owned, shared sink.
    pub fn shared(writer: Rc<RefCell<dyn Write>>) -> Self {
        Self::Shared(writer)
    }

    /// True if this sink is configured (not `None`).
    pub fn is_some(&self) -> bool {
        !matches!(self, LogSink::None)
    }

    /// Writes one line (a trailing `\n` is appended) to the sink, silently
    /// ignoring I/O errors: the leak dump and diagnostics are informational,
    /// never fatal, and the caller already owns the failure mode of a sink
    /// they supplied themselves.
    pub fn write_line(&self, line: &str) {
        match self {
            LogSink::None => {}
            LogSink::Owned(file) => {
                let mut file = file;
                let _ = writeln!(file, "{line}");
            }
            LogSink::Shared(writer) => {
                let _ = writeln!(writer.borrow_mut(), "{line}");
            }
        }
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogSink::None => f.write_str("LogSink::None"),
            LogSink::Owned(_) => f.write_str("LogSink::Owned(..)"),
            LogSink::Shared(_) => f.write_str("LogSink::Shared(..)"),
        }
    }
}
