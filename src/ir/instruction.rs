// Instruction representation for the output IR. Each instruction is a kind (with its
// operands inline) plus a result type, an optional symbolic name and the address of the
// machine instruction it was recovered from. Terminators are ordinary kinds; a block is
// closed once its last instruction is one of them. Branch destinations can name a block
// of the same function or an unresolved machine address, since block layout happens
// after lifting.

//! IR instructions.

use super::types::Type;
use super::value::{BlockId, Value};
use std::fmt;

/// Address of the machine instruction an operation was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebugLoc {
    pub address: u64,
}

impl DebugLoc {
    pub fn new(address: u64) -> Self {
        Self { address }
    }
}

/// Destination of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Block(BlockId),
    /// Absolute machine address, resolved by block layout.
    Address(u64),
    /// Displacement from an instruction whose address is unknown.
    Relative(i64),
}

impl Destination {
    /// Symbolic label for unresolved targets.
    pub fn label(self) -> Option<String> {
        match self {
            Destination::Block(_) => None,
            Destination::Address(addr) => Some(format!("addr_{addr:#x}")),
            Destination::Relative(disp) => Some(format!("rel_{disp:+}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    And,
    Or,
    Xor,
    Shl,
    AShr,
    LShr,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::UDiv => "udiv",
            BinOp::SRem => "srem",
            BinOp::URem => "urem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::AShr => "ashr",
            BinOp::LShr => "lshr",
            BinOp::FAdd => "fadd",
            BinOp::FSub => "fsub",
            BinOp::FMul => "fmul",
            BinOp::FDiv => "fdiv",
            BinOp::FRem => "frem",
        }
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::AShr | BinOp::LShr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FpTrunc,
    FpExt,
    FpToSi,
    FpToUi,
    SiToFp,
    UiToFp,
    Bitcast,
    IntToPtr,
    PtrToInt,
}

impl CastOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::FpTrunc => "fptrunc",
            CastOp::FpExt => "fpext",
            CastOp::FpToSi => "fptosi",
            CastOp::FpToUi => "fptoui",
            CastOp::SiToFp => "sitofp",
            CastOp::UiToFp => "uitofp",
            CastOp::Bitcast => "bitcast",
            CastOp::IntToPtr => "inttoptr",
            CastOp::PtrToInt => "ptrtoint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl IntPredicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatPredicate {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
    Ord,
    Uno,
    Ueq,
    Une,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl FloatPredicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            FloatPredicate::Oeq => "oeq",
            FloatPredicate::One => "one",
            FloatPredicate::Olt => "olt",
            FloatPredicate::Ole => "ole",
            FloatPredicate::Ogt => "ogt",
            FloatPredicate::Oge => "oge",
            FloatPredicate::Ord => "ord",
            FloatPredicate::Uno => "uno",
            FloatPredicate::Ueq => "ueq",
            FloatPredicate::Une => "une",
            FloatPredicate::Ult => "ult",
            FloatPredicate::Ule => "ule",
            FloatPredicate::Ugt => "ugt",
            FloatPredicate::Uge => "uge",
        }
    }
}

/// Intrinsic functions the emitter calls for operations without a plain instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Ctlz,
    Cttz,
    Ctpop,
    Fshl,
    Fshr,
    Fma,
    CopySign,
    Fabs,
    Floor,
    Ceil,
    Trunc,
    SMulOverflow,
    UMulOverflow,
}

impl Intrinsic {
    pub fn base_name(self) -> &'static str {
        match self {
            Intrinsic::Ctlz => "llvm.ctlz",
            Intrinsic::Cttz => "llvm.cttz",
            Intrinsic::Ctpop => "llvm.ctpop",
            Intrinsic::Fshl => "llvm.fshl",
            Intrinsic::Fshr => "llvm.fshr",
            Intrinsic::Fma => "llvm.fma",
            Intrinsic::CopySign => "llvm.copysign",
            Intrinsic::Fabs => "llvm.fabs",
            Intrinsic::Floor => "llvm.floor",
            Intrinsic::Ceil => "llvm.ceil",
            Intrinsic::Trunc => "llvm.trunc",
            Intrinsic::SMulOverflow => "llvm.smul.overflow",
            Intrinsic::UMulOverflow => "llvm.umul.overflow",
        }
    }

    /// Full overloaded name, mangled on the type of the first argument.
    pub fn name(self, overload: Type) -> String {
        format!("{}.{}", self.base_name(), overload.mangle())
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    Alloca { allocated: Type },
    Load { ptr: Value, volatile: bool },
    Store { value: Value, ptr: Value, volatile: bool },
    Binary { op: BinOp, lhs: Value, rhs: Value },
    FNeg { operand: Value },
    Cast { op: CastOp, value: Value },
    ICmp { pred: IntPredicate, lhs: Value, rhs: Value },
    FCmp { pred: FloatPredicate, lhs: Value, rhs: Value },
    Select { cond: Value, on_true: Value, on_false: Value },
    Call { intrinsic: Intrinsic, args: Vec<Value> },
    ExtractElement { vector: Value, index: Value },
    InsertElement { vector: Value, element: Value, index: Value },
    ShuffleVector { lhs: Value, rhs: Value, mask: Vec<i32> },
    Br { dest: Destination },
    CondBr { cond: Value, on_true: Destination, on_false: Destination },
    Ret { value: Option<Value> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub kind: InstKind,
    /// Result type; `Void` for stores and terminators.
    pub ty: Type,
    /// Symbolic name; empty for unnamed values.
    pub name: String,
    pub loc: Option<DebugLoc>,
}

impl Instruction {
    pub fn new(kind: InstKind, ty: Type) -> Self {
        Self { kind, ty, name: String::new(), loc: None }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self.kind, InstKind::Br { .. } | InstKind::CondBr { .. } | InstKind::Ret { .. })
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, InstKind::Ret { .. })
    }

    pub fn has_result(&self) -> bool {
        !self.ty.is_void()
    }

    /// Value operands in textual order.
    pub fn operands(&self) -> Vec<Value> {
        match &self.kind {
            InstKind::Alloca { .. } | InstKind::Br { .. } => Vec::new(),
            InstKind::Load { ptr, .. } => vec![*ptr],
            InstKind::Store { value, ptr, .. } => vec![*value, *ptr],
            InstKind::Binary { lhs, rhs, .. }
            | InstKind::ICmp { lhs, rhs, .. }
            | InstKind::FCmp { lhs, rhs, .. }
            | InstKind::ShuffleVector { lhs, rhs, .. } => vec![*lhs, *rhs],
            InstKind::FNeg { operand } => vec![*operand],
            InstKind::Cast { value, .. } => vec![*value],
            InstKind::Select { cond, on_true, on_false } => vec![*cond, *on_true, *on_false],
            InstKind::Call { args, .. } => args.clone(),
            InstKind::ExtractElement { vector, index } => vec![*vector, *index],
            InstKind::InsertElement { vector, element, index } => vec![*vector, *element, *index],
            InstKind::CondBr { cond, .. } => vec![*cond],
            InstKind::Ret { value } => value.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_labels() {
        assert_eq!(Destination::Address(0x1000).label().as_deref(), Some("addr_0x1000"));
        assert_eq!(Destination::Relative(-8).label().as_deref(), Some("rel_-8"));
        assert_eq!(Destination::Relative(16).label().as_deref(), Some("rel_+16"));
        assert_eq!(Destination::Block(BlockId(2)).label(), None);
    }

    #[test]
    fn test_intrinsic_mangling() {
        assert_eq!(Intrinsic::Ctlz.name(Type::I64), "llvm.ctlz.i64");
        assert_eq!(Intrinsic::Fabs.name(Type::F64), "llvm.fabs.f64");
    }
}
