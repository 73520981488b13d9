//! Forward interval dataflow over the CFG.
//!
//! The engine propagates an abstract state (value -> interval) through each
//! block in label order until no exit state changes. The interval lattice
//! has infinite ascending chains, so entry states are widened against the
//! previous visit: a bound that grew jumps straight to its infinity. This
//! is what guarantees termination on loops; an engine without it would
//! chase a counter's bounds forever.

use std::collections::HashMap;

use crate::analysis::cfg::Cfg;
use crate::analysis::range::Interval;
use crate::ir::function::FuncIr;
use crate::ir::op::{tagged_intrinsic, Op, TaggedIntrinsic};
use crate::ir::value::ValueId;

/// Abstract state: every tracked value's proven interval. A value absent
/// from the map carries no information (top at any merge).
pub type RangeMap = HashMap<ValueId, Interval>;

/// Register-wise join of two states.
///
/// Keys present on both sides join their intervals; a key present on only
/// one side joins against top (an unseen path may carry any value) and is
/// carried through as top.
pub fn join_states(a: &RangeMap, b: &RangeMap) -> RangeMap {
    let mut out = RangeMap::with_capacity(a.len().max(b.len()));
    for (&v, &iv) in a {
        let joined = match b.get(&v) {
            Some(&other) => iv.join(other),
            None => Interval::TOP,
        };
        out.insert(v, joined);
    }
    for &v in b.keys() {
        out.entry(v).or_insert(Interval::TOP);
    }
    out
}

/// Key-wise widening of a revisited entry state against the stored one.
fn widen_states(old: &RangeMap, new: &RangeMap) -> RangeMap {
    let mut out = RangeMap::with_capacity(new.len());
    for (&v, &niv) in new {
        let widened = match old.get(&v) {
            Some(&oiv) => Interval::widen(oiv, niv),
            None => niv,
        };
        out.insert(v, widened);
    }
    // Entry key sets only grow between visits; carrying stragglers keeps
    // the state monotone even if a predecessor's exit shrank its key set.
    for (&v, &oiv) in old {
        out.entry(v).or_insert(oiv);
    }
    out
}

/// Result interval of a recognized tagged-arithmetic intrinsic, or `None`
/// when an operand is untracked or the argument shape is unexpected.
fn eval_intrinsic(intr: TaggedIntrinsic, args: &[ValueId], state: &RangeMap) -> Option<Interval> {
    match intr {
        TaggedIntrinsic::Add | TaggedIntrinsic::Sub | TaggedIntrinsic::Mul => {
            let [lhs, rhs] = args else { return None };
            let a = *state.get(lhs)?;
            let b = *state.get(rhs)?;
            Some(match intr {
                TaggedIntrinsic::Add => a.add(b),
                TaggedIntrinsic::Sub => a.sub(b),
                TaggedIntrinsic::Mul => a.mul(b),
                TaggedIntrinsic::Neg => unreachable!(),
            })
        }
        TaggedIntrinsic::Neg => {
            let [operand] = args else { return None };
            Some(state.get(operand)?.neg())
        }
    }
}

/// Applies one operation's transfer function to the state.
///
/// Only integer literals, copies, and recognized intrinsics have rules;
/// every other result-bearing operation yields top for its result. Never
/// claiming a narrower range than proven is the soundness contract here.
fn apply_op(op: &Op, state: &mut RangeMap) {
    match op {
        Op::LoadInt { dest, value } => {
            state.insert(*dest, Interval::singleton(*value));
        }
        Op::Assign { dest, src } => {
            let iv = state.get(src).copied().unwrap_or(Interval::TOP);
            state.insert(*dest, iv);
        }
        Op::CallC { dest, func, args } => {
            let iv = tagged_intrinsic(func)
                .and_then(|intr| eval_intrinsic(intr, args, state))
                .unwrap_or(Interval::TOP);
            state.insert(*dest, iv);
        }
        other => {
            if let Some(dest) = other.dest() {
                state.insert(dest, Interval::TOP);
            }
        }
    }
}

/// Computes the exit abstract state of every block.
///
/// Forward propagation in label order: a block's entry state is the join
/// of its computed predecessors' exits (predecessors not yet computed
/// contribute nothing), widened against the entry stored on the previous
/// visit. Iterates until no exit changes.
pub fn analyze_integer_ranges(func: &FuncIr, cfg: &Cfg) -> Vec<RangeMap> {
    let n = func.blocks().len();
    let mut entries: Vec<Option<RangeMap>> = vec![None; n];
    let mut exits: Vec<Option<RangeMap>> = vec![None; n];

    loop {
        let mut changed = false;
        for i in 0..n {
            let mut entry = RangeMap::new();
            let mut seeded = false;
            for p in &cfg.pred[i] {
                if let Some(pred_exit) = &exits[p.0 as usize] {
                    if seeded {
                        entry = join_states(&entry, pred_exit);
                    } else {
                        entry = pred_exit.clone();
                        seeded = true;
                    }
                }
            }

            let entry = match &entries[i] {
                Some(old) => widen_states(old, &entry),
                None => entry,
            };

            let mut exit = entry.clone();
            for op in &func.blocks()[i].ops {
                apply_op(op, &mut exit);
            }

            if exits[i].as_ref() != Some(&exit) {
                changed = true;
            }
            entries[i] = Some(entry);
            exits[i] = Some(exit);
        }
        if !changed {
            break;
        }
    }

    exits.into_iter().map(Option::unwrap_or_default).collect()
}
