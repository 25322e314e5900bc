//! oolc-opt - Constant folding and dead-branch elimination.
//!
//! A single bottom-up traversal over every method body:
//!
//! - integer arithmetic and comparisons with two literal operands fold to
//!   a literal, using checked arithmetic so division by zero and
//!   overflow stay in the tree for the runtime to handle;
//! - strict boolean operators fold when fully literal; the short-circuit
//!   forms fold lazily on a literal left operand (`FALSE AND THEN x`
//!   becomes `FALSE` without looking at `x`, which the runtime would
//!   never have evaluated either);
//! - `IF` with a literal condition collapses to the taken branch,
//!   `WHILE FALSE` disappears, `WHILE TRUE` stays.
//!
//! Types are preserved on every rewritten node, and nothing folds across
//! calls, reads, writes or allocation: those subtrees are traversed but
//! always survive.

mod fold;

pub use fold::optimize;
