//! Fatal corruption conditions.
//!
//! These are never returned to a caller: every path that constructs one logs
//! it via `tracing` and then aborts the process. Corrupted allocator state
//! is not something a caller can meaningfully recover from, so there is no
//! `Result`-returning path for it to silently ignore.

/// A fatal condition detected while walking or dereferencing a block header.
#[derive(Debug, thiserror::Error)]
pub enum CorruptionError {
    #[error("free-list traversal found offset {offset} tagged {found:#010x}, expected MAGIC_FREE")]
    BadMagicOnTraversal { offset: u32, found: u32 },

    #[error("free() called on offset {offset} tagged {found:#010x}, expected MAGIC_ALLOC")]
    InvalidFree { offset: u32, found: u32 },

    #[error("public method called before init()")]
    Uninitialised,
}

/// Log `err` at error level with structured fields, then panic.
///
/// Does not return. A `panic!` terminates the process by default — the
/// allocator state is unsalvageable at this point, and there is no
/// partial-failure recovery — while still letting an embedding test harness
/// observe the failure with `#[should_panic]` rather than losing the whole
/// test binary to a hard `SIGABRT`.
pub fn abort_on_corruption(err: CorruptionError) -> ! {
    tracing::error!(error = %err, "suballocator: fatal corruption");
    panic!("{err}")
}
