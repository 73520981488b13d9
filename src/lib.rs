//! narrowint: integer range narrowing for a tagged-integer compiler IR.
//!
//! The host compiler lowers a dynamically typed language to a
//! register-based IR in which statically unknown integers are boxed with a
//! tag bit. This crate is the optimization pass that removes that overhead
//! where it can be proven safe:
//!
//! ```text
//! FuncIr → cleanup_cfg → build_cfg → analyze_integer_ranges (fixpoint,
//!   widening) → classify_narrowable (global join) → rewrite traversal
//!   (splice + substitute + environment bookkeeping) → type commit
//! ```
//!
//! Stages (in order):
//! 1. `cleanup_cfg`            — drop unreachable blocks, relabel densely
//! 2. `analyze_integer_ranges` — forward interval dataflow to fixpoint
//! 3. `classify_narrowable`    — which values fit the target native width
//! 4. `NarrowIntPass`          — retype literals, unbox copies, replace
//!    tagged-arithmetic runtime calls with native `IntOp`s
//!
//! The pass is single-threaded, deterministic, and idempotent; it mutates
//! the `FuncIr` in place and keeps the value environment coherent through
//! every replacement. Anything it cannot prove narrow it leaves alone.

pub mod analysis;
pub mod error;
pub mod ir;
pub mod pass;
pub mod report;

pub use analysis::{analyze_integer_ranges, build_cfg, cleanup_cfg, Bound, Cfg, Interval, RangeMap};
pub use error::PassError;
pub use ir::{
    tagged_intrinsic, Block, BlockId, CmpOp, Environment, FuncBuilder, FuncIr, IntBinOp, IntWidth,
    Op, RType, TaggedIntrinsic, ValueId, TAG_BITS,
};
pub use pass::{classify_narrowable, join_block_states, NarrowIntPass, Pass};
pub use report::{CollectingReporter, NullReporter, Reporter};

/// Runs the narrowing pass on one function body at the given width.
///
/// Convenience wrapper for hosts that do not need to inject a reporter.
pub fn optimize_integer_types(func: &mut FuncIr, width: IntWidth) -> Result<(), PassError> {
    NarrowIntPass::new(width).run(func)
}
