//! Stack growth for the recursive evaluator.
//!
//! Each nested operation costs a few native frames, so deep trees and deep
//! call chains would overflow the thread stack long before
//! [`MAX_CALL_DEPTH`](super::MAX_CALL_DEPTH) is reached.

/// Runs `f`, first growing the stack onto the heap if less than the red zone
/// remains.
#[cfg(not(target_arch = "wasm32"))]
#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 100 * 1024;
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// wasm32 cannot grow its stack.
#[cfg(target_arch = "wasm32")]
#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
