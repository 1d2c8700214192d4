//! Stack growth for the recursive parser and evaluator.
//!
//! Nesting and call depth are bounded elsewhere; this only makes sure the
//! bounded recursion never runs off the end of the native stack, whatever
//! thread the host runs us on.

/// Grow the stack when less than this remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
