//! Tagged-integer narrowing.
//!
//! Proves, by interval analysis, that some boxed-integer values can only
//! ever hold numbers inside a fixed native width, then rewrites the IR to
//! use native arithmetic for them: literals lose their tag bit, copies from
//! still-boxed sources gain an unbox, and tagged-arithmetic runtime calls
//! become native `IntOp`s. Everything the analysis cannot prove is left
//! untouched — a missed narrowing is a lost optimization, never a bug.

use std::collections::{HashMap, HashSet};

use crate::analysis::cfg::{build_cfg, cleanup_cfg};
use crate::analysis::dataflow::{analyze_integer_ranges, RangeMap};
use crate::analysis::range::Interval;
use crate::error::PassError;
use crate::ir::block::Block;
use crate::ir::function::FuncIr;
use crate::ir::op::{tagged_intrinsic, IntBinOp, Op, TaggedIntrinsic};
use crate::ir::types::{IntWidth, RType, TAG_BITS};
use crate::ir::value::{Environment, ValueId};
use crate::pass::Pass;
use crate::report::{NullReporter, Reporter};

/// Joins every block's contribution for each value into one summary.
///
/// Join is associative and commutative, so the block order does not matter.
/// A value appears in the summary iff some block state recorded it.
pub fn join_block_states(states: &[RangeMap]) -> RangeMap {
    let mut summary = RangeMap::new();
    for state in states {
        for (&v, &iv) in state {
            summary
                .entry(v)
                .and_modify(|s| *s = s.join(iv))
                .or_insert(iv);
        }
    }
    summary
}

/// Decides which values qualify for narrowing to `width`.
///
/// A value qualifies iff it is currently declared as a boxed integer and
/// its globally joined interval lies inside the width's representable
/// range, boundaries inclusive. Values with no recorded interval, or top
/// (every value touched by an unmodeled operation ends up top), never
/// qualify.
pub fn classify_narrowable(
    func: &FuncIr,
    states: &[RangeMap],
    width: IntWidth,
) -> HashSet<ValueId> {
    let summary = join_block_states(states);
    summary
        .iter()
        .filter(|&(&v, iv)| func.env().ty(v) == Some(RType::BoxedInt) && iv.fits(width))
        .map(|(&v, _)| v)
        .collect()
}

/// The narrowing pass for one target width.
///
/// Deterministic and idempotent: running it twice on the same function is
/// a no-op the second time, because already-narrowed values are no longer
/// declared boxed and so never re-qualify.
pub struct NarrowIntPass {
    width: IntWidth,
}

impl NarrowIntPass {
    pub fn new(width: IntWidth) -> Self {
        Self { width }
    }

    /// Runs the pass, sending the computed register ranges to `reporter`.
    ///
    /// The report is observational only; it reflects the pre-rewrite
    /// analysis and has no effect on the transformed IR.
    pub fn run_with_reporter(
        &mut self,
        func: &mut FuncIr,
        reporter: &mut dyn Reporter,
    ) -> Result<(), PassError> {
        validate(func)?;

        // Dead blocks (typically unused error handlers) would otherwise
        // contribute spurious writes to the analysis.
        cleanup_cfg(func);
        let cfg = build_cfg(func);

        let exits = analyze_integer_ranges(func, &cfg);
        let summary = join_block_states(&exits);
        let mut narrow = classify_narrowable(func, &exits, self.width);
        prune_unrewritable(func, &mut narrow, self.width);

        for block in func.blocks.iter_mut() {
            rewrite_block(block, &narrow, self.width, &mut func.env);
        }

        // Commit declared types on qualifying registers. Temporaries were
        // retyped (or replaced) at their defining site during the
        // traversal; registers are retyped here, idempotent for those
        // already retyped at an assignment.
        for &v in &narrow {
            if func.env.is_register(v) {
                func.env.set_ty(v, RType::Native(self.width));
            }
        }

        let ranges: Vec<(String, Interval)> = func
            .env
            .registers()
            .iter()
            .filter_map(|&r| {
                let iv = summary.get(&r)?;
                let name = func
                    .env
                    .name(r)
                    .map(str::to_owned)
                    .unwrap_or_else(|| r.to_string());
                Some((name, *iv))
            })
            .collect();
        reporter.ranges(&func.name, &ranges);

        Ok(())
    }
}

impl Pass for NarrowIntPass {
    fn name(&self) -> &'static str {
        "narrow-int"
    }

    fn run(&mut self, func: &mut FuncIr) -> Result<(), PassError> {
        self.run_with_reporter(func, &mut NullReporter)
    }
}

/// Drops qualifying values the rewrite could not keep representation-
/// consistent, so "classified narrow" and "actually rewritten" agree.
///
/// A value may only narrow if every consumer ends up reading the native
/// representation: a rewritten intrinsic call, a copy into a narrowing
/// destination, native arithmetic, a `Box`, or a `Return` (the call
/// boundary re-boxes by declared type). Any other consumer still expects
/// the boxed encoding, so the values it reads must stay boxed.
///
/// An intrinsic call is rewritten only when its result qualifies, every
/// operand is narrow or already native, and the result is not read from
/// another block (reference substitution is intra-block only). A call
/// that stays behind pins its result and its operands boxed.
///
/// Removal cascades both through operands and through consumers, so this
/// iterates to a fixpoint. Literal loads never need pruning on their own;
/// their rewrites preserve the result identity.
fn prune_unrewritable(func: &FuncIr, narrow: &mut HashSet<ValueId>, width: IntWidth) {
    let native = RType::Native(width);

    let mut def_block: HashMap<ValueId, u32> = HashMap::new();
    for block in func.blocks() {
        for op in &block.ops {
            if let Some(dest) = op.dest() {
                if !func.env().is_register(dest) {
                    def_block.insert(dest, block.label.0);
                }
            }
        }
    }
    let mut cross_block: HashSet<ValueId> = HashSet::new();
    for block in func.blocks() {
        for op in &block.ops {
            for src in op.sources() {
                if def_block.get(&src).is_some_and(|&b| b != block.label.0) {
                    cross_block.insert(src);
                }
            }
        }
    }

    loop {
        let mut changed = false;
        for block in func.blocks() {
            for op in &block.ops {
                match op {
                    Op::CallC { dest, func: callee, args } => {
                        let arity = match tagged_intrinsic(callee) {
                            Some(TaggedIntrinsic::Neg) => Some(1),
                            Some(_) => Some(2),
                            None => None,
                        };
                        let rewritten = arity == Some(args.len())
                            && narrow.contains(dest)
                            && !cross_block.contains(dest)
                            && args
                                .iter()
                                .all(|a| narrow.contains(a) || func.env().ty(*a) == Some(native));
                        if !rewritten {
                            // The call stays as-is and consumes the boxed
                            // encoding at runtime.
                            changed |= narrow.remove(dest);
                            for a in args {
                                changed |= narrow.remove(a);
                            }
                        }
                    }
                    Op::Assign { dest, src } => {
                        // A copy into a narrowing destination reads the
                        // native value; into anything else it must hand
                        // over the original representation.
                        if !narrow.contains(dest) && func.env().ty(*dest) != Some(native) {
                            changed |= narrow.remove(src);
                        }
                    }
                    Op::Return { .. } | Op::IntOp { .. } | Op::Box { .. } => {}
                    other => {
                        for src in other.sources() {
                            changed |= narrow.remove(&src);
                        }
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
}

/// Rejects IR the downstream stages could not survive: a block with no
/// terminator, or a branch to a label outside the block list.
fn validate(func: &FuncIr) -> Result<(), PassError> {
    let n = func.blocks().len() as u32;
    for block in func.blocks() {
        let term = block
            .terminator()
            .ok_or_else(|| PassError::MissingTerminator {
                func: func.name.clone(),
                block: block.label.0,
            })?;
        for target in term.targets() {
            if target.0 >= n {
                return Err(PassError::DanglingTarget {
                    func: func.name.clone(),
                    block: block.label.0,
                    target: target.0,
                });
            }
        }
    }
    Ok(())
}

/// Checks whether a foreign call can be rewritten to native arithmetic:
/// the callee must be a recognized intrinsic with the expected operand
/// count, the result must qualify, and every operand must either qualify
/// or already be native at the target width.
fn plan_intrinsic(
    dest: ValueId,
    func_name: &str,
    args: &[ValueId],
    narrow: &HashSet<ValueId>,
    env: &Environment,
    width: IntWidth,
) -> Option<TaggedIntrinsic> {
    let intr = tagged_intrinsic(func_name)?;
    let expected_args = match intr {
        TaggedIntrinsic::Neg => 1,
        _ => 2,
    };
    if args.len() != expected_args {
        return None;
    }
    if !narrow.contains(&dest) {
        return None;
    }
    let native = RType::Native(width);
    if !args
        .iter()
        .all(|a| narrow.contains(a) || env.ty(*a) == Some(native))
    {
        return None;
    }
    Some(intr)
}

/// One forward traversal over a block.
///
/// Each operation is kept, mutated in place, or replaced by a spliced
/// sequence whose last element stands in for the original result. A
/// replacement is atomic: splice, migrate the debug entry to the stand-in,
/// register new intermediates, and redirect every later reference in this
/// block. References from other blocks to a replaced result are not
/// tracked; callers must not narrow values that are live across blocks
/// through a replaced operation (a known limitation of the intra-block
/// substitution scope).
fn rewrite_block(
    block: &mut Block,
    narrow: &HashSet<ValueId>,
    width: IntWidth,
    env: &mut Environment,
) {
    let native = RType::Native(width);
    let mut reps: HashMap<ValueId, ValueId> = HashMap::new();
    let mut out: Vec<Op> = Vec::with_capacity(block.ops.len());

    for mut op in block.ops.drain(..) {
        op.replace_sources(&reps);
        match op {
            // Qualifying values were declared boxed when classified, so on
            // a rerun nothing re-qualifies and these arms never fire. A
            // register assigned in several blocks is already native here
            // once the first site retyped it; each site still rewrites.
            Op::LoadInt { dest, value } if narrow.contains(&dest) => {
                // Reinterpret the tagged literal as its machine value.
                env.set_ty(dest, native);
                out.push(Op::LoadInt {
                    dest,
                    value: value >> TAG_BITS,
                });
            }
            Op::Assign { dest, src } if narrow.contains(&dest) => {
                env.set_ty(dest, native);
                if narrow.contains(&src) || env.ty(src) == Some(native) {
                    out.push(Op::Assign { dest, src });
                } else {
                    // The source stays boxed; convert before the copy. The
                    // destination register keeps its identity, so no
                    // substitution entry is needed.
                    let tmp = env.new_temp(native);
                    out.push(Op::Unbox {
                        dest: tmp,
                        src,
                        ty: native,
                    });
                    out.push(Op::Assign { dest, src: tmp });
                }
            }
            Op::CallC { dest, func, args } => {
                match plan_intrinsic(dest, &func, &args, narrow, env, width) {
                    Some(TaggedIntrinsic::Neg) => {
                        let zero = env.new_temp(native);
                        let new_dest = env.new_temp(native);
                        env.transfer(dest, new_dest);
                        reps.insert(dest, new_dest);
                        out.push(Op::LoadInt {
                            dest: zero,
                            value: 0,
                        });
                        out.push(Op::IntOp {
                            dest: new_dest,
                            op: IntBinOp::Sub,
                            lhs: zero,
                            rhs: args[0],
                        });
                    }
                    Some(intr) => {
                        let bin_op = match intr {
                            TaggedIntrinsic::Add => IntBinOp::Add,
                            TaggedIntrinsic::Sub => IntBinOp::Sub,
                            TaggedIntrinsic::Mul => IntBinOp::Mul,
                            TaggedIntrinsic::Neg => unreachable!("handled above"),
                        };
                        let new_dest = env.new_temp(native);
                        env.transfer(dest, new_dest);
                        reps.insert(dest, new_dest);
                        out.push(Op::IntOp {
                            dest: new_dest,
                            op: bin_op,
                            lhs: args[0],
                            rhs: args[1],
                        });
                    }
                    None => out.push(Op::CallC { dest, func, args }),
                }
            }
            other => out.push(other),
        }
    }

    block.ops = out;
}
