//! End-to-end narrowing pass tests: literal/intrinsic rewriting, width
//! selection, conservative exclusions, replacement bookkeeping, error
//! reporting, and idempotence.

use std::collections::{HashMap, HashSet};

use narrowint::{
    optimize_integer_types, BlockId, Bound, CollectingReporter, FuncBuilder, FuncIr, IntBinOp,
    IntWidth, Interval, NarrowIntPass, Op, PassError, RType, ValueId,
};

/// Checks the rewrite-consistency property: no operation references a
/// removed identity, and the environment holds exactly one entry per live
/// value.
fn assert_consistent(func: &FuncIr) {
    let mut live: HashSet<ValueId> = func.env().registers().iter().copied().collect();
    for block in func.blocks() {
        for op in &block.ops {
            if let Some(dest) = op.dest() {
                live.insert(dest);
            }
        }
    }
    for block in func.blocks() {
        for op in &block.ops {
            for src in op.sources() {
                assert!(live.contains(&src), "dangling reference {} in '{}'", src, op);
                assert!(func.env().contains(src), "no environment entry for {}", src);
            }
        }
    }
    let env_values: HashSet<ValueId> = func.env().values().collect();
    assert_eq!(env_values, live, "environment out of sync with live values");
}

fn type_snapshot(func: &FuncIr) -> HashMap<ValueId, RType> {
    func.env()
        .values()
        .map(|v| (v, func.env().ty(v).expect("live value has a type")))
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Literal add: intrinsic becomes a native IntOp, literals lose their tag
// ---------------------------------------------------------------------------
#[test]
fn test_literal_add_is_narrowed() {
    let mut b = FuncBuilder::new("add_const");
    let r = b.new_register("x", RType::BoxedInt);
    let entry = b.new_block();
    b.set_current_block(entry);
    let five = b.const_int(5);
    let three = b.const_int(3);
    let sum = b.call_c("tagged_add", vec![five, three], RType::BoxedInt);
    b.assign(r, sum);
    b.ret(Some(r));
    let mut func = b.build();
    let sum_index = func.env().index(sum).expect("sum is registered");

    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");

    let ops = &func.blocks()[0].ops;
    assert_eq!(ops.len(), 5, "no ops added or dropped: {:?}", ops);
    // Literals are untagged in place and retyped.
    assert_eq!(ops[0], Op::LoadInt { dest: five, value: 5 });
    assert_eq!(ops[1], Op::LoadInt { dest: three, value: 3 });
    assert_eq!(func.env().ty(five), Some(RType::Native(IntWidth::W32)));
    assert_eq!(func.env().ty(three), Some(RType::Native(IntWidth::W32)));
    // The runtime call is now native arithmetic over the same operands.
    let new_dest = match &ops[2] {
        Op::IntOp { dest, op: IntBinOp::Add, lhs, rhs } => {
            assert_eq!((*lhs, *rhs), (five, three));
            *dest
        }
        other => panic!("expected native add, got '{}'", other),
    };
    // The copy and the return follow the stand-in result.
    assert_eq!(ops[3], Op::Assign { dest: r, src: new_dest });
    assert_eq!(ops[4], Op::Return { value: Some(r) });
    // The returned register is retyped; the replaced call's debug entry
    // migrated to the stand-in and the stale entry is gone.
    assert_eq!(func.env().ty(r), Some(RType::Native(IntWidth::W32)));
    assert!(!func.env().contains(sum));
    assert_eq!(func.env().index(new_dest), Some(sum_index));
    assert_consistent(&func);
}

// ---------------------------------------------------------------------------
// 2. Width selection: [-5, 7] fits 32-bit, [0, 2^40] only fits 64-bit
// ---------------------------------------------------------------------------
fn build_two_ranges() -> (FuncIr, ValueId, ValueId) {
    let mut b = FuncBuilder::new("two_ranges");
    let cond = b.add_param("cond", RType::Object);
    let a = b.new_register("a", RType::BoxedInt);
    let wide = b.new_register("b", RType::BoxedInt);
    let entry = b.new_block();
    let then_bb = b.new_block();
    let else_bb = b.new_block();
    let merge = b.new_block();

    b.set_current_block(entry);
    b.branch(cond, then_bb, else_bb);

    b.set_current_block(then_bb);
    let m5 = b.const_int(-5);
    b.assign(a, m5);
    let z = b.const_int(0);
    b.assign(wide, z);
    b.goto(merge);

    b.set_current_block(else_bb);
    let p7 = b.const_int(7);
    b.assign(a, p7);
    let big = b.const_int(1 << 40);
    b.assign(wide, big);
    b.goto(merge);

    b.set_current_block(merge);
    b.ret(Some(a));
    (b.build(), a, wide)
}

#[test]
fn test_w32_pass_narrows_only_the_small_range() {
    let (mut func, a, wide) = build_two_ranges();
    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");
    assert_eq!(func.env().ty(a), Some(RType::Native(IntWidth::W32)));
    assert_eq!(func.env().ty(wide), Some(RType::BoxedInt));
    assert_consistent(&func);
}

#[test]
fn test_w64_pass_narrows_both_ranges() {
    let (mut func, a, wide) = build_two_ranges();
    optimize_integer_types(&mut func, IntWidth::W64).expect("well-formed input");
    assert_eq!(func.env().ty(a), Some(RType::Native(IntWidth::W64)));
    assert_eq!(func.env().ty(wide), Some(RType::Native(IntWidth::W64)));
    assert_consistent(&func);
}

// ---------------------------------------------------------------------------
// 3. A register defined by an unmodeled operation is never narrowed
// ---------------------------------------------------------------------------
#[test]
fn test_unmodeled_definition_excluded() {
    let mut b = FuncBuilder::new("attr_read");
    let obj = b.add_param("o", RType::Object);
    let r = b.new_register("x", RType::BoxedInt);
    let s = b.new_register("y", RType::BoxedInt);
    let entry = b.new_block();
    b.set_current_block(entry);
    let attr = b.get_attr(obj, "count", RType::BoxedInt);
    b.assign(r, attr);
    let lit = b.const_int(5);
    b.assign(s, lit);
    b.ret(Some(r));
    let mut func = b.build();

    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");

    // The attribute value could be anything; the literal elsewhere does
    // not rescue it.
    assert_eq!(func.env().ty(r), Some(RType::BoxedInt));
    assert_eq!(func.env().ty(attr), Some(RType::BoxedInt));
    // The independent literal-fed register narrows as usual.
    assert_eq!(func.env().ty(s), Some(RType::Native(IntWidth::W32)));
    assert!(func.blocks()[0]
        .ops
        .iter()
        .any(|op| matches!(op, Op::GetAttr { .. })));
    assert_consistent(&func);
}

// ---------------------------------------------------------------------------
// 4. An unbounded loop counter is widened out of eligibility
// ---------------------------------------------------------------------------
#[test]
fn test_loop_counter_not_narrowed() {
    let mut b = FuncBuilder::new("count_up");
    let cond = b.add_param("cond", RType::Object);
    let i = b.new_register("i", RType::BoxedInt);
    let entry = b.new_block();
    let body = b.new_block();
    let done = b.new_block();

    b.set_current_block(entry);
    let zero = b.const_int(0);
    b.assign(i, zero);
    b.goto(body);

    b.set_current_block(body);
    let one = b.const_int(1);
    let next = b.call_c("tagged_add", vec![i, one], RType::BoxedInt);
    b.assign(i, next);
    b.branch(cond, body, done);

    b.set_current_block(done);
    b.ret(Some(i));
    let mut func = b.build();

    optimize_integer_types(&mut func, IntWidth::W64).expect("well-formed input");

    assert_eq!(func.env().ty(i), Some(RType::BoxedInt));
    // The increment stays a runtime call.
    assert!(func.blocks()[1]
        .ops
        .iter()
        .any(|op| matches!(op, Op::CallC { .. })));
    assert_consistent(&func);
}

// ---------------------------------------------------------------------------
// 5. Negation synthesizes a zero literal and a native subtraction
// ---------------------------------------------------------------------------
#[test]
fn test_negation_becomes_zero_minus_operand() {
    let mut b = FuncBuilder::new("neg_const");
    let entry = b.new_block();
    b.set_current_block(entry);
    let five = b.const_int(5);
    let neg = b.call_c("tagged_neg", vec![five], RType::BoxedInt);
    b.ret(Some(neg));
    let mut func = b.build();

    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");

    let ops = &func.blocks()[0].ops;
    assert_eq!(ops.len(), 4, "one call becomes two ops: {:?}", ops);
    assert_eq!(ops[0], Op::LoadInt { dest: five, value: 5 });
    let zero = match &ops[1] {
        Op::LoadInt { dest, value: 0 } => *dest,
        other => panic!("expected zero literal, got '{}'", other),
    };
    assert_eq!(func.env().ty(zero), Some(RType::Native(IntWidth::W32)));
    let new_dest = match &ops[2] {
        Op::IntOp { dest, op: IntBinOp::Sub, lhs, rhs } => {
            assert_eq!((*lhs, *rhs), (zero, five));
            *dest
        }
        other => panic!("expected native sub, got '{}'", other),
    };
    assert_eq!(ops[3], Op::Return { value: Some(new_dest) });
    assert!(!func.env().contains(neg));
    assert_consistent(&func);
}

// ---------------------------------------------------------------------------
// 6. Copy from a still-boxed source gains an unbox
// ---------------------------------------------------------------------------
#[test]
fn test_assign_from_boxed_source_unboxes() {
    let mut b = FuncBuilder::new("mixed_copy");
    let src = b.new_register("src", RType::BoxedInt);
    let dest = b.new_register("dest", RType::BoxedInt);
    let entry = b.new_block();
    let tail = b.new_block();

    b.set_current_block(entry);
    let small = b.const_int(5);
    b.assign(src, small);
    b.assign(dest, src);
    b.goto(tail);

    b.set_current_block(tail);
    let huge = b.const_int(1 << 40);
    b.assign(src, huge);
    b.ret(Some(dest));
    let mut func = b.build();

    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");

    // `src` joins to [10, 2^41] and stays boxed; `dest` saw only the small
    // copy, so the copy is rewritten through an unbox.
    assert_eq!(func.env().ty(src), Some(RType::BoxedInt));
    assert_eq!(func.env().ty(dest), Some(RType::Native(IntWidth::W32)));
    let ops = &func.blocks()[0].ops;
    let unbox_at = ops
        .iter()
        .position(|op| matches!(op, Op::Unbox { src: s, .. } if *s == src))
        .expect("copy should be preceded by an unbox");
    match (&ops[unbox_at], &ops[unbox_at + 1]) {
        (Op::Unbox { dest: tmp, ty, .. }, Op::Assign { dest: d, src: s }) => {
            assert_eq!(*ty, RType::Native(IntWidth::W32));
            assert_eq!(*d, dest);
            assert_eq!(s, tmp);
            assert_eq!(func.env().ty(*tmp), Some(RType::Native(IntWidth::W32)));
        }
        other => panic!("expected unbox/assign pair, got {:?}", other),
    }
    assert_consistent(&func);
}

// ---------------------------------------------------------------------------
// 7. An intrinsic with a non-qualifying operand is left alone, even when
//    its own result range fits
// ---------------------------------------------------------------------------
#[test]
fn test_intrinsic_with_wide_operand_kept() {
    let mut b = FuncBuilder::new("mul_by_zero");
    let entry = b.new_block();
    b.set_current_block(entry);
    let wide = b.const_int(1 << 40);
    let zero = b.const_int(0);
    // Result range is exactly [0, 0], but the left operand cannot narrow.
    let prod = b.call_c("tagged_mul", vec![wide, zero], RType::BoxedInt);
    b.ret(Some(prod));
    let mut func = b.build();

    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");

    assert_eq!(func.env().ty(prod), Some(RType::BoxedInt));
    assert!(func.blocks()[0]
        .ops
        .iter()
        .any(|op| matches!(op, Op::CallC { func: f, .. } if f == "tagged_mul")));
    assert_consistent(&func);
}

// ---------------------------------------------------------------------------
// 8. Values feeding operations left in boxed form keep the boxed encoding
// ---------------------------------------------------------------------------
#[test]
fn test_operand_of_kept_call_stays_tagged() {
    let mut b = FuncBuilder::new("mul_wide");
    let entry = b.new_block();
    b.set_current_block(entry);
    let wide = b.const_int(1 << 40);
    let two = b.const_int(2);
    let prod = b.call_c("tagged_mul", vec![wide, two], RType::BoxedInt);
    b.ret(Some(prod));
    let mut func = b.build();

    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");

    // The call survives (its left operand is out of range), so both of its
    // operands must keep the tagged encoding the runtime expects; untagging
    // the small literal in place would halve the operand the kept call
    // computes with.
    assert!(func.blocks()[0]
        .ops
        .iter()
        .any(|op| matches!(op, Op::CallC { func: f, .. } if f == "tagged_mul")));
    assert_eq!(func.blocks()[0].ops[1], Op::LoadInt { dest: two, value: 4 });
    assert_eq!(func.env().ty(two), Some(RType::BoxedInt));
    assert_eq!(func.env().ty(prod), Some(RType::BoxedInt));
    assert_consistent(&func);
}

#[test]
fn test_source_of_boxed_destination_copy_stays_tagged() {
    let mut b = FuncBuilder::new("boxed_sink");
    let g = b.new_register("g", RType::BoxedInt);
    let entry = b.new_block();
    let tail = b.new_block();
    b.set_current_block(entry);
    let small = b.const_int(5);
    b.assign(g, small);
    b.goto(tail);
    b.set_current_block(tail);
    let huge = b.const_int(1 << 40);
    b.assign(g, huge);
    b.ret(Some(g));
    let mut func = b.build();

    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");

    // `g` joins to [10, 2^41] and stays boxed. The small literal copied
    // into it must stay tagged too; no `Box` is spliced, so a raw native
    // value must never flow into a boxed register.
    assert_eq!(func.env().ty(g), Some(RType::BoxedInt));
    assert_eq!(func.env().ty(small), Some(RType::BoxedInt));
    assert_eq!(
        func.blocks()[0].ops[0],
        Op::LoadInt {
            dest: small,
            value: 10
        }
    );
    assert_consistent(&func);
}

// ---------------------------------------------------------------------------
// 9. An intrinsic result read from another block is not replaced
// ---------------------------------------------------------------------------
#[test]
fn test_cross_block_use_blocks_replacement() {
    let mut b = FuncBuilder::new("cross_block");
    let entry = b.new_block();
    let tail = b.new_block();
    b.set_current_block(entry);
    let two = b.const_int(2);
    let three = b.const_int(3);
    let sum = b.call_c("tagged_add", vec![two, three], RType::BoxedInt);
    b.goto(tail);
    b.set_current_block(tail);
    b.ret(Some(sum));
    let mut func = b.build();

    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");

    // Substitution is intra-block; replacing the call would leave the
    // return in the next block dangling.
    assert!(func.env().contains(sum));
    assert_eq!(func.env().ty(sum), Some(RType::BoxedInt));
    assert_eq!(func.blocks()[1].ops[0], Op::Return { value: Some(sum) });
    assert_consistent(&func);
}

// ---------------------------------------------------------------------------
// 10. Idempotence: the second run is a no-op
// ---------------------------------------------------------------------------
#[test]
fn test_pass_is_idempotent() {
    let (mut func, _, _) = build_two_ranges();
    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");
    let blocks_after_first: Vec<_> = func.blocks().to_vec();
    let types_after_first = type_snapshot(&func);

    optimize_integer_types(&mut func, IntWidth::W32).expect("well-formed input");
    assert_eq!(func.blocks(), &blocks_after_first[..]);
    assert_eq!(type_snapshot(&func), types_after_first);
}

// ---------------------------------------------------------------------------
// 11. Malformed input is fatal, not silently recovered
// ---------------------------------------------------------------------------
#[test]
fn test_missing_terminator_is_fatal() {
    let mut b = FuncBuilder::new("open_block");
    let entry = b.new_block();
    b.set_current_block(entry);
    b.const_int(1);
    let mut func = b.build();

    let err = optimize_integer_types(&mut func, IntWidth::W32).unwrap_err();
    assert_eq!(
        err,
        PassError::MissingTerminator {
            func: "open_block".into(),
            block: 0,
        }
    );
}

#[test]
fn test_dangling_branch_target_is_fatal() {
    let mut b = FuncBuilder::new("bad_target");
    let entry = b.new_block();
    b.set_current_block(entry);
    b.goto(BlockId(7));
    let mut func = b.build();

    let err = optimize_integer_types(&mut func, IntWidth::W32).unwrap_err();
    assert_eq!(
        err,
        PassError::DanglingTarget {
            func: "bad_target".into(),
            block: 0,
            target: 7,
        }
    );
}

// ---------------------------------------------------------------------------
// 12. The injected reporter sees the joined register ranges
// ---------------------------------------------------------------------------
#[test]
fn test_reporter_receives_register_ranges() {
    let (mut func, _, _) = build_two_ranges();
    let mut reporter = CollectingReporter::default();
    NarrowIntPass::new(IntWidth::W32)
        .run_with_reporter(&mut func, &mut reporter)
        .expect("well-formed input");

    assert_eq!(reporter.reports.len(), 1);
    let (name, ranges) = &reporter.reports[0];
    assert_eq!(name, "two_ranges");
    // Encodings: -5 -> -10, 7 -> 14, 0 -> 0, 2^40 -> 2^41.
    let by_name: HashMap<&str, Interval> =
        ranges.iter().map(|(n, iv)| (n.as_str(), *iv)).collect();
    assert_eq!(
        by_name.get("a"),
        Some(&Interval::new(Bound::Finite(-10), Bound::Finite(14)))
    );
    assert_eq!(
        by_name.get("b"),
        Some(&Interval::new(Bound::Finite(0), Bound::Finite(1 << 41)))
    );
}
