use crate::ir::block::{Block, BlockId};
use crate::ir::op::Op;
use crate::ir::types::{RType, TAG_BITS};
use crate::ir::value::{Environment, ValueId};

/// One function body in register-based IR form.
///
/// The block list, the environment, and every operation are exclusively
/// owned by the invoking compilation thread; passes mutate the structure in
/// place and must leave it internally consistent (see `NarrowIntPass`).
#[derive(Debug)]
pub struct FuncIr {
    pub name: String,
    /// Function arguments, as registers declared in the environment.
    pub params: Vec<ValueId>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) env: Environment,
}

impl FuncIr {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0 as usize)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }
}

/// Builder for constructing a `FuncIr` incrementally.
///
/// Call order:
/// 1. `add_param()` / `new_register()` — declare registers
/// 2. `new_block()` — allocate one or more blocks
/// 3. `set_current_block()` — point the cursor at a block
/// 4. `push()` or the emit helpers — append operations
/// 5. `build()` — consume the builder and return the `FuncIr`
///
/// `build()` performs no structural checks; the narrowing pass validates
/// terminators and branch targets up front and reports malformed input as
/// a `PassError` rather than a panic.
pub struct FuncBuilder {
    func: FuncIr,
    current_block: Option<BlockId>,
}

impl FuncBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            func: FuncIr {
                name: name.into(),
                params: Vec::new(),
                blocks: Vec::new(),
                env: Environment::new(),
            },
            current_block: None,
        }
    }

    /// Declares a function argument register.
    pub fn add_param(&mut self, name: impl Into<String>, ty: RType) -> ValueId {
        let id = self.func.env.new_register(name, ty);
        self.func.params.push(id);
        id
    }

    /// Declares a local variable register.
    pub fn new_register(&mut self, name: impl Into<String>, ty: RType) -> ValueId {
        self.func.env.new_register(name, ty)
    }

    /// Creates a new block and returns its label.
    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.func.blocks.len() as u32);
        self.func.blocks.push(Block::new(id));
        id
    }

    pub fn set_current_block(&mut self, block: BlockId) {
        self.current_block = Some(block);
    }

    /// Appends an operation to the current block.
    pub fn push(&mut self, op: Op) {
        let block = self
            .current_block
            .expect("FuncBuilder: no current block set before push");
        self.func.blocks[block.0 as usize].ops.push(op);
    }

    /// Emits a boxed integer literal and returns its result value.
    ///
    /// The stored operand is the tagged encoding, so `literal` must fit in
    /// 63 bits.
    pub fn const_int(&mut self, literal: i64) -> ValueId {
        let dest = self.func.env.new_temp(RType::BoxedInt);
        self.push(Op::LoadInt {
            dest,
            value: literal << TAG_BITS,
        });
        dest
    }

    /// Emits a foreign call and returns its result value.
    pub fn call_c(&mut self, func: impl Into<String>, args: Vec<ValueId>, ty: RType) -> ValueId {
        let dest = self.func.env.new_temp(ty);
        self.push(Op::CallC {
            dest,
            func: func.into(),
            args,
        });
        dest
    }

    /// Emits an attribute read yielding an opaque object.
    pub fn get_attr(&mut self, obj: ValueId, attr: impl Into<String>, ty: RType) -> ValueId {
        let dest = self.func.env.new_temp(ty);
        self.push(Op::GetAttr {
            dest,
            obj,
            attr: attr.into(),
        });
        dest
    }

    /// Emits a comparison yielding an opaque result.
    pub fn cmp(&mut self, op: crate::ir::op::CmpOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dest = self.func.env.new_temp(RType::Object);
        self.push(Op::ComparisonOp { dest, op, lhs, rhs });
        dest
    }

    pub fn assign(&mut self, dest: ValueId, src: ValueId) {
        self.push(Op::Assign { dest, src });
    }

    pub fn goto(&mut self, target: BlockId) {
        self.push(Op::Goto { target });
    }

    pub fn branch(&mut self, cond: ValueId, on_true: BlockId, on_false: BlockId) {
        self.push(Op::Branch {
            cond,
            on_true,
            on_false,
        });
    }

    pub fn ret(&mut self, value: Option<ValueId>) {
        self.push(Op::Return { value });
    }

    /// Consumes the builder and returns the completed `FuncIr`.
    pub fn build(self) -> FuncIr {
        self.func
    }
}
