use thiserror::Error;

/// Errors raised by IR passes.
///
/// These are all internal invariant violations in the input IR: the pass
/// must not attempt partial recovery, since downstream code generation
/// assumes a well-formed CFG. Unmodeled operations are not errors; they
/// conservatively yield no range information.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PassError {
    #[error("in function '{func}': block {block} does not end with a terminator")]
    MissingTerminator { func: String, block: u32 },

    #[error("in function '{func}': block {block} branches to non-existent block {target}")]
    DanglingTarget { func: String, block: u32, target: u32 },
}
