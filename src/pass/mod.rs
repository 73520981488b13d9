pub mod narrow;

pub use narrow::{classify_narrowable, join_block_states, NarrowIntPass};

use crate::error::PassError;
use crate::ir::function::FuncIr;

/// A compiler pass that operates on one function body in place.
///
/// Passes must be deterministic: given the same `FuncIr`, the transformed
/// output must be identical across runs (no global mutable state, no
/// randomness). On error the function state is unspecified; the invoking
/// pipeline aborts the whole unit.
pub trait Pass {
    /// Human-readable name, used in error messages and diagnostics.
    fn name(&self) -> &'static str;

    /// Runs the pass on the function.
    fn run(&mut self, func: &mut FuncIr) -> Result<(), PassError>;
}
