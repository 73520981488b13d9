use crate::ir::op::Op;

/// An opaque index identifying a basic block within a `FuncIr`.
///
/// After `cleanup_cfg` relabels the function, `BlockId(n)` indexes
/// `blocks[n]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A basic block: an ordered operation sequence ending in a terminator.
///
/// Invariants checked by the narrowing pass's up-front validation
/// (`FuncBuilder::build()` performs no structural checks):
/// 1. `ops` is non-empty; its last element is the only terminator.
/// 2. Branch targets name blocks that exist in the owning function.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub label: BlockId,
    /// Operations in program order. Terminator is last.
    pub ops: Vec<Op>,
}

impl Block {
    pub fn new(label: BlockId) -> Self {
        Self {
            label,
            ops: Vec::new(),
        }
    }

    /// Returns the terminator if the block is sealed.
    pub fn terminator(&self) -> Option<&Op> {
        self.ops.last().filter(|op| op.is_terminator())
    }

    /// A block is sealed when it ends with a terminator.
    pub fn is_sealed(&self) -> bool {
        self.terminator().is_some()
    }
}
