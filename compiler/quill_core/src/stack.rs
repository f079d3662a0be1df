//! Native stack growth for nested execution.
//!
//! Every nested `execute_in` (block bodies, function calls, file loads)
//! recurses on the native stack. Deep user recursion would overflow it long
//! before the call-stack limit is reached, so each level goes through
//! [`ensure_sufficient_stack`].

/// Run `f`, first growing the stack when less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Space that must remain before a level is entered.
    const RED_ZONE: usize = 128 * 1024;

    /// Size of each newly allocated segment.
    const STACK_PER_LEVEL: usize = 2 * 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_LEVEL, f)
}

/// wasm32 has no stacker support; run directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
