pub mod block;
pub mod function;
pub mod op;
pub mod types;
pub mod value;

pub use block::{Block, BlockId};
pub use function::{FuncBuilder, FuncIr};
pub use op::{tagged_intrinsic, CmpOp, IntBinOp, Op, TaggedIntrinsic};
pub use types::{IntWidth, RType, TAG_BITS};
pub use value::{Environment, ValueId};
