use std::collections::HashMap;

use crate::ir::block::BlockId;
use crate::ir::types::RType;
use crate::ir::value::ValueId;

/// Native binary integer operations (post-narrowing arithmetic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntBinOp {
    Add,
    Sub,
    Mul,
}

impl std::fmt::Display for IntBinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntBinOp::Add => f.write_str("add"),
            IntBinOp::Sub => f.write_str("sub"),
            IntBinOp::Mul => f.write_str("mul"),
        }
    }
}

/// Comparison operations. Yield a boolean-ish result; opaque to narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl std::fmt::Display for CmpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
            CmpOp::Lt => "lt",
            CmpOp::Le => "le",
            CmpOp::Gt => "gt",
            CmpOp::Ge => "ge",
        };
        f.write_str(s)
    }
}

/// Tagged-integer runtime helpers the analysis understands.
///
/// These are the only foreign calls with a transfer rule; every other
/// callee yields no range information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggedIntrinsic {
    Add,
    Sub,
    Mul,
    Neg,
}

/// Maps a foreign-call callee name to the intrinsic it implements.
pub fn tagged_intrinsic(func: &str) -> Option<TaggedIntrinsic> {
    match func {
        "tagged_add" => Some(TaggedIntrinsic::Add),
        "tagged_sub" => Some(TaggedIntrinsic::Sub),
        "tagged_mul" => Some(TaggedIntrinsic::Mul),
        "tagged_neg" => Some(TaggedIntrinsic::Neg),
        _ => None,
    }
}

/// A single IR operation.
///
/// Invariants:
/// - Terminators (`Goto`, `Branch`, `Return`, `Unreachable`) are the last
///   operation in a block; no operation may follow one.
/// - A result-bearing operation defines exactly one `ValueId`, allocated
///   from the function's `Environment`.
/// - An operation lives in exactly one block's sequence until replaced.
///
/// The set is closed on purpose: `dest`, `sources`, `is_terminator`, and
/// `replace_sources` all match exhaustively, so adding a variant without
/// deciding its behavior in every pass is a build-time error, not a silent
/// no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    // ---- Control flow (terminators) ----
    Goto {
        target: BlockId,
    },
    Branch {
        cond: ValueId,
        on_true: BlockId,
        on_false: BlockId,
    },
    Return {
        value: Option<ValueId>,
    },
    /// Marks a block that analysis proved cannot be entered.
    Unreachable,

    // ---- Data operations ----
    /// Integer literal. While `dest` is boxed, `value` holds the tagged
    /// encoding (`literal << TAG_BITS`); once `dest` is native, the raw
    /// machine value.
    LoadInt {
        dest: ValueId,
        value: i64,
    },
    /// Copy into a register. Registers are mutable storage, so the same
    /// `dest` may be assigned in several places.
    Assign {
        dest: ValueId,
        src: ValueId,
    },
    GetAttr {
        dest: ValueId,
        obj: ValueId,
        attr: String,
    },
    SetAttr {
        obj: ValueId,
        attr: String,
        src: ValueId,
    },
    LoadStatic {
        dest: ValueId,
        name: String,
    },
    InitStatic {
        name: String,
        src: ValueId,
    },
    TupleGet {
        dest: ValueId,
        src: ValueId,
        index: usize,
    },
    TupleSet {
        dest: ValueId,
        items: Vec<ValueId>,
    },
    IncRef {
        src: ValueId,
    },
    DecRef {
        src: ValueId,
    },
    Call {
        dest: ValueId,
        callee: String,
        args: Vec<ValueId>,
    },
    MethodCall {
        dest: ValueId,
        obj: ValueId,
        method: String,
        args: Vec<ValueId>,
    },
    Cast {
        dest: ValueId,
        src: ValueId,
        ty: RType,
    },
    /// Wrap a native value into the boxed representation.
    Box {
        dest: ValueId,
        src: ValueId,
    },
    /// Convert a boxed value to a native representation.
    Unbox {
        dest: ValueId,
        src: ValueId,
        ty: RType,
    },
    Raise {
        kind: String,
        msg: String,
    },
    /// Call into the C runtime. Recognized callees (`tagged_add` etc.) get
    /// interval transfer rules; everything else is opaque.
    CallC {
        dest: ValueId,
        func: String,
        args: Vec<ValueId>,
    },
    Truncate {
        dest: ValueId,
        src: ValueId,
        from: RType,
        to: RType,
    },
    LoadGlobal {
        dest: ValueId,
        name: String,
    },
    /// Native binary integer arithmetic on already-narrowed operands.
    IntOp {
        dest: ValueId,
        op: IntBinOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    ComparisonOp {
        dest: ValueId,
        op: CmpOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    LoadMem {
        dest: ValueId,
        addr: ValueId,
    },
    SetMem {
        addr: ValueId,
        src: ValueId,
    },
    LoadAddress {
        dest: ValueId,
        src: ValueId,
    },
    GetElementPtr {
        dest: ValueId,
        base: ValueId,
        index: ValueId,
    },
}

impl Op {
    /// Returns the `ValueId` this operation defines, if any.
    pub fn dest(&self) -> Option<ValueId> {
        match self {
            Op::Goto { .. } => None,
            Op::Branch { .. } => None,
            Op::Return { .. } => None,
            Op::Unreachable => None,
            Op::LoadInt { dest, .. } => Some(*dest),
            Op::Assign { dest, .. } => Some(*dest),
            Op::GetAttr { dest, .. } => Some(*dest),
            Op::SetAttr { .. } => None,
            Op::LoadStatic { dest, .. } => Some(*dest),
            Op::InitStatic { .. } => None,
            Op::TupleGet { dest, .. } => Some(*dest),
            Op::TupleSet { dest, .. } => Some(*dest),
            Op::IncRef { .. } => None,
            Op::DecRef { .. } => None,
            Op::Call { dest, .. } => Some(*dest),
            Op::MethodCall { dest, .. } => Some(*dest),
            Op::Cast { dest, .. } => Some(*dest),
            Op::Box { dest, .. } => Some(*dest),
            Op::Unbox { dest, .. } => Some(*dest),
            Op::Raise { .. } => None,
            Op::CallC { dest, .. } => Some(*dest),
            Op::Truncate { dest, .. } => Some(*dest),
            Op::LoadGlobal { dest, .. } => Some(*dest),
            Op::IntOp { dest, .. } => Some(*dest),
            Op::ComparisonOp { dest, .. } => Some(*dest),
            Op::LoadMem { dest, .. } => Some(*dest),
            Op::SetMem { .. } => None,
            Op::LoadAddress { dest, .. } => Some(*dest),
            Op::GetElementPtr { dest, .. } => Some(*dest),
        }
    }

    /// Returns all `ValueId`s this operation reads.
    pub fn sources(&self) -> Vec<ValueId> {
        match self {
            Op::Goto { .. } => vec![],
            Op::Branch { cond, .. } => vec![*cond],
            Op::Return { value } => value.iter().copied().collect(),
            Op::Unreachable => vec![],
            Op::LoadInt { .. } => vec![],
            Op::Assign { src, .. } => vec![*src],
            Op::GetAttr { obj, .. } => vec![*obj],
            Op::SetAttr { obj, src, .. } => vec![*obj, *src],
            Op::LoadStatic { .. } => vec![],
            Op::InitStatic { src, .. } => vec![*src],
            Op::TupleGet { src, .. } => vec![*src],
            Op::TupleSet { items, .. } => items.clone(),
            Op::IncRef { src } => vec![*src],
            Op::DecRef { src } => vec![*src],
            Op::Call { args, .. } => args.clone(),
            Op::MethodCall { obj, args, .. } => {
                let mut srcs = vec![*obj];
                srcs.extend_from_slice(args);
                srcs
            }
            Op::Cast { src, .. } => vec![*src],
            Op::Box { src, .. } => vec![*src],
            Op::Unbox { src, .. } => vec![*src],
            Op::Raise { .. } => vec![],
            Op::CallC { args, .. } => args.clone(),
            Op::Truncate { src, .. } => vec![*src],
            Op::LoadGlobal { .. } => vec![],
            Op::IntOp { lhs, rhs, .. } => vec![*lhs, *rhs],
            Op::ComparisonOp { lhs, rhs, .. } => vec![*lhs, *rhs],
            Op::LoadMem { addr, .. } => vec![*addr],
            Op::SetMem { addr, src } => vec![*addr, *src],
            Op::LoadAddress { src, .. } => vec![*src],
            Op::GetElementPtr { base, index, .. } => vec![*base, *index],
        }
    }

    /// Returns `true` if this operation ends a block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Op::Goto { .. } | Op::Branch { .. } | Op::Return { .. } | Op::Unreachable
        )
    }

    /// Successor block labels of a terminator (empty for non-terminators,
    /// `Return`, and `Unreachable`).
    pub fn targets(&self) -> Vec<BlockId> {
        match self {
            Op::Goto { target } => vec![*target],
            Op::Branch {
                on_true, on_false, ..
            } => vec![*on_true, *on_false],
            _ => vec![],
        }
    }

    /// Redirects every source slot found in `reps` to its replacement.
    ///
    /// This is the reference substitution primitive: when an operation is
    /// replaced by a sequence with a fresh result identity, every later
    /// operation in the same block is rewritten through this method.
    pub fn replace_sources(&mut self, reps: &HashMap<ValueId, ValueId>) {
        let sub = |v: &mut ValueId| {
            if let Some(&r) = reps.get(v) {
                *v = r;
            }
        };
        match self {
            Op::Goto { .. } => {}
            Op::Branch { cond, .. } => sub(cond),
            Op::Return { value } => {
                if let Some(v) = value {
                    sub(v);
                }
            }
            Op::Unreachable => {}
            Op::LoadInt { .. } => {}
            Op::Assign { src, .. } => sub(src),
            Op::GetAttr { obj, .. } => sub(obj),
            Op::SetAttr { obj, src, .. } => {
                sub(obj);
                sub(src);
            }
            Op::LoadStatic { .. } => {}
            Op::InitStatic { src, .. } => sub(src),
            Op::TupleGet { src, .. } => sub(src),
            Op::TupleSet { items, .. } => {
                for v in items {
                    sub(v);
                }
            }
            Op::IncRef { src } => sub(src),
            Op::DecRef { src } => sub(src),
            Op::Call { args, .. } => {
                for v in args {
                    sub(v);
                }
            }
            Op::MethodCall { obj, args, .. } => {
                sub(obj);
                for v in args {
                    sub(v);
                }
            }
            Op::Cast { src, .. } => sub(src),
            Op::Box { src, .. } => sub(src),
            Op::Unbox { src, .. } => sub(src),
            Op::Raise { .. } => {}
            Op::CallC { args, .. } => {
                for v in args {
                    sub(v);
                }
            }
            Op::Truncate { src, .. } => sub(src),
            Op::LoadGlobal { .. } => {}
            Op::IntOp { lhs, rhs, .. } => {
                sub(lhs);
                sub(rhs);
            }
            Op::ComparisonOp { lhs, rhs, .. } => {
                sub(lhs);
                sub(rhs);
            }
            Op::LoadMem { addr, .. } => sub(addr),
            Op::SetMem { addr, src } => {
                sub(addr);
                sub(src);
            }
            Op::LoadAddress { src, .. } => sub(src),
            Op::GetElementPtr { base, index, .. } => {
                sub(base);
                sub(index);
            }
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Goto { target } => write!(f, "goto {}", target),
            Op::Branch {
                cond,
                on_true,
                on_false,
            } => write!(f, "branch {} ? {} : {}", cond, on_true, on_false),
            Op::Return { value: Some(v) } => write!(f, "return {}", v),
            Op::Return { value: None } => f.write_str("return"),
            Op::Unreachable => f.write_str("unreachable"),
            Op::LoadInt { dest, value } => write!(f, "{} = load_int {}", dest, value),
            Op::Assign { dest, src } => write!(f, "{} = {}", dest, src),
            Op::GetAttr { dest, obj, attr } => write!(f, "{} = {}.{}", dest, obj, attr),
            Op::SetAttr { obj, attr, src } => write!(f, "{}.{} = {}", obj, attr, src),
            Op::LoadStatic { dest, name } => write!(f, "{} = static {}", dest, name),
            Op::InitStatic { name, src } => write!(f, "static {} = {}", name, src),
            Op::TupleGet { dest, src, index } => write!(f, "{} = {}[{}]", dest, src, index),
            Op::TupleSet { dest, items } => {
                write!(f, "{} = tuple(", dest)?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str(")")
            }
            Op::IncRef { src } => write!(f, "inc_ref {}", src),
            Op::DecRef { src } => write!(f, "dec_ref {}", src),
            Op::Call { dest, callee, args } => {
                write!(f, "{} = call {}({} args)", dest, callee, args.len())
            }
            Op::MethodCall {
                dest, obj, method, ..
            } => write!(f, "{} = {}.{}()", dest, obj, method),
            Op::Cast { dest, src, ty } => write!(f, "{} = cast {} to {}", dest, src, ty),
            Op::Box { dest, src } => write!(f, "{} = box {}", dest, src),
            Op::Unbox { dest, src, ty } => write!(f, "{} = unbox {} to {}", dest, src, ty),
            Op::Raise { kind, msg } => write!(f, "raise {}({:?})", kind, msg),
            Op::CallC { dest, func, args } => {
                write!(f, "{} = call_c {}({} args)", dest, func, args.len())
            }
            Op::Truncate { dest, src, to, .. } => {
                write!(f, "{} = truncate {} to {}", dest, src, to)
            }
            Op::LoadGlobal { dest, name } => write!(f, "{} = global {}", dest, name),
            Op::IntOp { dest, op, lhs, rhs } => {
                write!(f, "{} = {} {}, {}", dest, op, lhs, rhs)
            }
            Op::ComparisonOp { dest, op, lhs, rhs } => {
                write!(f, "{} = cmp_{} {}, {}", dest, op, lhs, rhs)
            }
            Op::LoadMem { dest, addr } => write!(f, "{} = load [{}]", dest, addr),
            Op::SetMem { addr, src } => write!(f, "[{}] = {}", addr, src),
            Op::LoadAddress { dest, src } => write!(f, "{} = &{}", dest, src),
            Op::GetElementPtr { dest, base, index } => {
                write!(f, "{} = gep {}, {}", dest, base, index)
            }
        }
    }
}
