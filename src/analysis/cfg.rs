//! Control-flow graph view and dead-block cleanup.
//!
//! Both utilities are consumed by the narrowing pass as-is: `cleanup_cfg`
//! mutates the block list in place (and nothing else), `build_cfg` is a
//! pure view over terminator targets.

use std::collections::HashMap;

use crate::ir::block::BlockId;
use crate::ir::function::FuncIr;
use crate::ir::op::Op;

/// Successor/predecessor adjacency, indexed by block label.
#[derive(Debug)]
pub struct Cfg {
    pub succ: Vec<Vec<BlockId>>,
    pub pred: Vec<Vec<BlockId>>,
}

/// Builds the CFG from terminator targets.
///
/// Assumes the function has already been relabeled so `BlockId(n)` indexes
/// `blocks[n]` (see `cleanup_cfg`), and that every branch target is in
/// range. An out-of-range target panics; callers validate first, the way
/// `NarrowIntPass` does before invoking this.
pub fn build_cfg(func: &FuncIr) -> Cfg {
    let n = func.blocks.len();
    let mut succ: Vec<Vec<BlockId>> = vec![Vec::new(); n];
    let mut pred: Vec<Vec<BlockId>> = vec![Vec::new(); n];
    for block in &func.blocks {
        if let Some(term) = block.terminator() {
            for target in term.targets() {
                succ[block.label.0 as usize].push(target);
                pred[target.0 as usize].push(block.label);
            }
        }
    }
    Cfg { succ, pred }
}

/// Removes blocks unreachable from the entry block, relabels the survivors
/// densely, and rewrites branch targets to match.
///
/// Unused error-handling blocks are the usual casualties; dropping them
/// up front keeps their register writes from polluting the analysis.
/// Environment entries for temporaries defined only in dropped blocks are
/// removed so the registry keeps exactly one entry per live value.
///
/// Every branch target of a reachable block must be in range (validated
/// by the pass before this runs); an out-of-range target panics during
/// relabeling.
pub fn cleanup_cfg(func: &mut FuncIr) {
    if func.blocks.is_empty() {
        return;
    }

    // Depth-first reachability over terminator targets.
    let mut reachable = vec![false; func.blocks.len()];
    let mut stack = vec![0usize];
    while let Some(i) = stack.pop() {
        if reachable[i] {
            continue;
        }
        reachable[i] = true;
        if let Some(term) = func.blocks[i].terminator() {
            for target in term.targets() {
                let t = target.0 as usize;
                if t < func.blocks.len() && !reachable[t] {
                    stack.push(t);
                }
            }
        }
    }

    if reachable.iter().all(|&r| r) {
        // Nothing to drop; still renumber so labels are dense.
        for (i, block) in func.blocks.iter_mut().enumerate() {
            block.label = BlockId(i as u32);
        }
        return;
    }

    // Old label -> new label for the surviving blocks.
    let mut relabel: HashMap<BlockId, BlockId> = HashMap::new();
    let mut next = 0u32;
    for (i, block) in func.blocks.iter().enumerate() {
        if reachable[i] {
            relabel.insert(block.label, BlockId(next));
            next += 1;
        }
    }

    // Drop dead blocks, retiring their temporaries from the environment.
    let mut dropped = Vec::new();
    let mut kept = Vec::with_capacity(next as usize);
    for (i, block) in func.blocks.drain(..).enumerate() {
        if reachable[i] {
            kept.push(block);
        } else {
            dropped.push(block);
        }
    }
    func.blocks = kept;
    for block in &dropped {
        for op in &block.ops {
            if let Some(dest) = op.dest() {
                if !func.env.is_register(dest) {
                    func.env.remove(dest);
                }
            }
        }
    }

    // Relabel survivors and redirect their terminators.
    for (i, block) in func.blocks.iter_mut().enumerate() {
        block.label = BlockId(i as u32);
        if let Some(op) = block.ops.last_mut() {
            match op {
                Op::Goto { target } => *target = relabel[target],
                Op::Branch {
                    on_true, on_false, ..
                } => {
                    *on_true = relabel[on_true];
                    *on_false = relabel[on_false];
                }
                _ => {}
            }
        }
    }
}
