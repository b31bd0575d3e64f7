// This module is the output side of the lifter: a small, target-independent SSA IR in the
// LLVM mould. It deliberately stops at what recovered instruction semantics need: typed
// values, memory operations through opaque pointers, casts, comparisons, a few intrinsics,
// vector element operations and branches whose targets may still be raw machine
// addresses. The Module doubles as the module-scope symbol table holding one global
// storage cell per architectural register.

//! Target-independent output IR.
//!
//! # Key Components
//!
//! - [`Module`] - globals and lifted functions
//! - [`Function`] - blocks of instructions plus a per-function [`SymbolTable`]
//! - [`IrBuilder`] - positioned instruction construction
//! - [`display`] - LLVM-flavoured text output

pub mod builder;
pub mod display;
pub mod function;
pub mod instruction;
pub mod module;
pub mod symbols;
pub mod types;
pub mod value;

pub use builder::IrBuilder;
pub use function::{Block, Function};
pub use instruction::{
    BinOp, CastOp, DebugLoc, Destination, FloatPredicate, InstKind, Instruction, IntPredicate,
    Intrinsic,
};
pub use module::{GlobalVariable, Module};
pub use symbols::SymbolTable;
pub use types::{ScalarKind, Type};
pub use value::{BlockId, GlobalId, InstId, Value};
