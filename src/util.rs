//! Small shared helpers.

use std::panic::{self, AssertUnwindSafe};

/// Run a closure, returning `fallback` if it panics.
///
/// This is the crate's single panic barrier: it is applied once, at the
/// install hook's `format_error` boundary, so that error reporting itself can
/// never take down the host process. Inner pipeline stages degrade through
/// `Option`/`Result` and must not use this.
pub fn catch_or<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or(fallback)
}
