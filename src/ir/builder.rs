//! Builder API for appending IR to a function.
//!
//! A builder is positioned at a block, either appending at its end or inserting ahead of
//! its terminator, and stamps every instruction with the current debug location. Names
//! are passed in already disambiguated; an empty name produces an unnamed value.

use super::function::Function;
use super::instruction::{
    BinOp, CastOp, DebugLoc, Destination, FloatPredicate, InstKind, Instruction, IntPredicate,
    Intrinsic,
};
use super::types::Type;
use super::value::{BlockId, InstId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertPoint {
    End,
    BeforeTerminator,
}

pub struct IrBuilder<'a> {
    func: &'a mut Function,
    block: BlockId,
    point: InsertPoint,
    loc: Option<DebugLoc>,
}

impl<'a> IrBuilder<'a> {
    /// Append to the end of `block`.
    pub fn at_end(func: &'a mut Function, block: BlockId) -> Self {
        Self { func, block, point: InsertPoint::End, loc: None }
    }

    /// Insert ahead of the terminator of `block`.
    pub fn before_terminator(func: &'a mut Function, block: BlockId) -> Self {
        Self { func, block, point: InsertPoint::BeforeTerminator, loc: None }
    }

    pub fn with_loc(mut self, loc: Option<DebugLoc>) -> Self {
        self.loc = loc;
        self
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    fn insert(&mut self, kind: InstKind, ty: Type, name: &str) -> InstId {
        let mut inst = Instruction::new(kind, ty);
        inst.name = name.to_string();
        inst.loc = self.loc;
        match self.point {
            InsertPoint::End => self.func.append(self.block, inst),
            InsertPoint::BeforeTerminator => self.func.insert_before_terminator(self.block, inst),
        }
    }

    fn value(&mut self, kind: InstKind, ty: Type, name: &str) -> Value {
        Value::Inst(self.insert(kind, ty, name))
    }

    /// Reserve a stack slot of type `allocated`.
    pub fn alloca(&mut self, allocated: Type, name: &str) -> InstId {
        self.insert(InstKind::Alloca { allocated }, Type::Ptr, name)
    }

    pub fn load(&mut self, ty: Type, ptr: Value, volatile: bool, name: &str) -> Value {
        self.value(InstKind::Load { ptr, volatile }, ty, name)
    }

    pub fn store(&mut self, value: Value, ptr: Value, volatile: bool) -> InstId {
        self.insert(InstKind::Store { value, ptr, volatile }, Type::Void, "")
    }

    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value, name: &str) -> Value {
        let ty = self.func.type_of(lhs);
        self.value(InstKind::Binary { op, lhs, rhs }, ty, name)
    }

    pub fn fneg(&mut self, operand: Value, name: &str) -> Value {
        let ty = self.func.type_of(operand);
        self.value(InstKind::FNeg { operand }, ty, name)
    }

    pub fn cast(&mut self, op: CastOp, value: Value, to: Type, name: &str) -> Value {
        self.value(InstKind::Cast { op, value }, to, name)
    }

    pub fn icmp(&mut self, pred: IntPredicate, lhs: Value, rhs: Value, name: &str) -> Value {
        let ty = compare_type(self.func.type_of(lhs));
        self.value(InstKind::ICmp { pred, lhs, rhs }, ty, name)
    }

    pub fn fcmp(&mut self, pred: FloatPredicate, lhs: Value, rhs: Value, name: &str) -> Value {
        let ty = compare_type(self.func.type_of(lhs));
        self.value(InstKind::FCmp { pred, lhs, rhs }, ty, name)
    }

    pub fn select(&mut self, cond: Value, on_true: Value, on_false: Value, name: &str) -> Value {
        let ty = self.func.type_of(on_true);
        self.value(InstKind::Select { cond, on_true, on_false }, ty, name)
    }

    pub fn call(&mut self, intrinsic: Intrinsic, args: Vec<Value>, ty: Type, name: &str) -> Value {
        self.value(InstKind::Call { intrinsic, args }, ty, name)
    }

    pub fn extract_element(&mut self, vector: Value, index: Value, name: &str) -> Value {
        let ty = self.func.type_of(vector).element();
        self.value(InstKind::ExtractElement { vector, index }, ty, name)
    }

    pub fn insert_element(&mut self, vector: Value, element: Value, index: Value, name: &str) -> Value {
        let ty = self.func.type_of(vector);
        self.value(InstKind::InsertElement { vector, element, index }, ty, name)
    }

    pub fn shuffle_vector(&mut self, lhs: Value, rhs: Value, mask: Vec<i32>, name: &str) -> Value {
        let ty = self.func.type_of(lhs).with_lanes(mask.len() as u16);
        self.value(InstKind::ShuffleVector { lhs, rhs, mask }, ty, name)
    }

    pub fn br(&mut self, dest: Destination) -> InstId {
        self.insert(InstKind::Br { dest }, Type::Void, "")
    }

    pub fn cond_br(&mut self, cond: Value, on_true: Destination, on_false: Destination) -> InstId {
        self.insert(InstKind::CondBr { cond, on_true, on_false }, Type::Void, "")
    }

    pub fn ret(&mut self, value: Option<Value>) -> InstId {
        self.insert(InstKind::Ret { value }, Type::Void, "")
    }
}

fn compare_type(operand: Type) -> Type {
    match operand {
        Type::Vector { lanes, .. } => Type::Vector { lanes, elem: super::types::ScalarKind::Int(1) },
        _ => Type::I1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_infers_result_types() {
        let mut func = Function::new("f");
        let block = func.add_block("body");
        let mut b = IrBuilder::at_end(&mut func, block);
        let x = b.binary(BinOp::Add, Value::const_int(Type::I32, 1), Value::const_int(Type::I32, 2), "x");
        let c = b.icmp(IntPredicate::Slt, x, Value::const_int(Type::I32, 0), "c");
        let w = b.cast(CastOp::ZExt, c, Type::I64, "");
        b.ret(None);

        assert_eq!(func.type_of(x), Type::I32);
        assert_eq!(func.type_of(c), Type::I1);
        assert_eq!(func.type_of(w), Type::I64);
        assert_eq!(func.value_name(x), Some("x"));
        assert_eq!(func.value_name(w), None);
        assert!(func.is_terminated(block));
    }
}
