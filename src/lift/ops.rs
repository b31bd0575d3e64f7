// Value-producing visitors of the emitter: integer and floating-point arithmetic,
// comparisons, conversions and vector operations. Operations with a direct IR
// counterpart become one instruction; the rest (high multiplies, carries, rotates,
// register pairs, subvector extraction) are spelled out as short instruction sequences
// or intrinsic calls. Every value is named after the register it ends up in when a
// CopyToReg consumes it, and after its first named operand otherwise.

use super::context::NodeValues;
use super::emitter::{absent, DagEmitter};
use crate::core::{DiagnosticKind, LiftResult};
use crate::dag::{CondCode, Node, NodeId, Payload};
use crate::ir::{BinOp, CastOp, FloatPredicate, IntPredicate, Intrinsic, Type, Value};

impl DagEmitter<'_, '_> {
    pub(super) fn visit_binary(&mut self, id: NodeId, node: &Node, op: BinOp) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..2)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let lhs = ops[0];
        let mut rhs = ops[1];
        let ty = self.func.type_of(lhs);
        if op.is_shift() || ty.is_integer() {
            rhs = self.coerce(rhs, ty, &base);
        }
        let name = self.fresh(&base);
        let value = self.builder().binary(op, lhs, rhs, &name);
        Ok(self.values(node, &[Some(value)]))
    }

    pub(super) fn visit_rotate(&mut self, id: NodeId, node: &Node, left: bool) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..2)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let ty = self.func.type_of(ops[0]);
        let amount = self.coerce(ops[1], ty, &base);
        let intrinsic = if left { Intrinsic::Fshl } else { Intrinsic::Fshr };
        let name = self.fresh(&base);
        let value = self.builder().call(intrinsic, vec![ops[0], ops[0], amount], ty, &name);
        Ok(self.values(node, &[Some(value)]))
    }

    /// Scalar integer operands, reported as untranslatable otherwise.
    fn scalar_int_operands(&mut self, id: NodeId, node: &Node, count: usize) -> LiftResult<Option<Vec<Value>>> {
        let Some(ops) = self.operands(id, node, 0..count)? else {
            return Ok(None);
        };
        if !self.func.type_of(ops[0]).is_integer() {
            self.report(
                DiagnosticKind::UnknownOpcode,
                id,
                format!("{} needs scalar integer operands", node.opcode),
            );
            return Ok(None);
        }
        Ok(Some(ops))
    }

    /// Full-width product of two operands in an integer twice their width.
    fn wide_product(&mut self, lhs: Value, rhs: Value, signed: bool, base: &str) -> Value {
        let ty = self.func.type_of(lhs);
        let wide = Type::Int((ty.bits() * 2) as u16);
        let ext = if signed { CastOp::SExt } else { CastOp::ZExt };
        let name = self.fresh(base);
        let lhs = self.builder().cast(ext, lhs, wide, &name);
        let name = self.fresh(base);
        let rhs = self.builder().cast(ext, rhs, wide, &name);
        let name = self.fresh(base);
        self.builder().binary(BinOp::Mul, lhs, rhs, &name)
    }

    fn high_half(&mut self, wide_value: Value, ty: Type, base: &str) -> Value {
        let wide = self.func.type_of(wide_value);
        let name = self.fresh(base);
        let shifted =
            self.builder().binary(BinOp::LShr, wide_value, Value::const_int(wide, ty.bits() as u64), &name);
        let name = self.fresh(base);
        self.builder().cast(CastOp::Trunc, shifted, ty, &name)
    }

    pub(super) fn visit_mul_high(&mut self, id: NodeId, node: &Node, signed: bool) -> LiftResult<NodeValues> {
        let Some(ops) = self.scalar_int_operands(id, node, 2)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let ty = self.func.type_of(ops[0]);
        let product = self.wide_product(ops[0], ops[1], signed, &base);
        let high = self.high_half(product, ty, &base);
        Ok(self.values(node, &[Some(high)]))
    }

    pub(super) fn visit_mul_lohi(&mut self, id: NodeId, node: &Node, signed: bool) -> LiftResult<NodeValues> {
        let Some(ops) = self.scalar_int_operands(id, node, 2)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let ty = self.func.type_of(ops[0]);
        let product = self.wide_product(ops[0], ops[1], signed, &base);
        let name = self.fresh(&base);
        let low = self.builder().cast(CastOp::Trunc, product, ty, &name);
        let high = self.high_half(product, ty, &base);
        Ok(self.values(node, &[Some(low), Some(high)]))
    }

    pub(super) fn visit_divrem(&mut self, id: NodeId, node: &Node, signed: bool) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..2)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let (div, rem) = if signed { (BinOp::SDiv, BinOp::SRem) } else { (BinOp::UDiv, BinOp::URem) };
        let name = self.fresh(&base);
        let quotient = self.builder().binary(div, ops[0], ops[1], &name);
        let name = self.fresh(&base);
        let remainder = self.builder().binary(rem, ops[0], ops[1], &name);
        Ok(self.values(node, &[Some(quotient), Some(remainder)]))
    }

    pub(super) fn visit_mul_overflow(&mut self, id: NodeId, node: &Node, signed: bool) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..2)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let name = self.fresh(&base);
        let product = self.builder().binary(BinOp::Mul, ops[0], ops[1], &name);
        let intrinsic = if signed { Intrinsic::SMulOverflow } else { Intrinsic::UMulOverflow };
        let name = self.fresh(&base);
        let mut overflow = self.builder().call(intrinsic, vec![ops[0], ops[1]], Type::I1, &name);
        if let Some(flag_ty) = node.value_type(1).and_then(|vt| vt.to_ir()) {
            overflow = self.coerce(overflow, flag_ty, &base);
        }
        Ok(self.values(node, &[Some(product), Some(overflow)]))
    }

    /// `addc`/`subc` and their carry-consuming `adde`/`sube` forms. The second result is
    /// the carry (or borrow) out as an `i1`.
    pub(super) fn visit_carry(
        &mut self,
        id: NodeId,
        node: &Node,
        subtract: bool,
        extended: bool,
    ) -> LiftResult<NodeValues> {
        let arity = if extended { 3 } else { 2 };
        let Some(ops) = self.operands(id, node, 0..arity)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let (lhs, rhs) = (ops[0], ops[1]);
        let ty = self.func.type_of(lhs);
        let op = if subtract { BinOp::Sub } else { BinOp::Add };

        let name = self.fresh(&base);
        let partial = self.builder().binary(op, lhs, rhs, &name);
        let name = self.fresh(&base);
        let first_carry = if subtract {
            self.builder().icmp(IntPredicate::Ult, lhs, rhs, &name)
        } else {
            self.builder().icmp(IntPredicate::Ult, partial, lhs, &name)
        };
        if !extended {
            return Ok(self.values(node, &[Some(partial), Some(first_carry)]));
        }

        let carry_in = self.coerce(ops[2], ty, &base);
        let name = self.fresh(&base);
        let result = self.builder().binary(op, partial, carry_in, &name);
        let name = self.fresh(&base);
        let second_carry = if subtract {
            self.builder().icmp(IntPredicate::Ult, partial, carry_in, &name)
        } else {
            self.builder().icmp(IntPredicate::Ult, result, partial, &name)
        };
        let name = self.fresh(&base);
        let carry = self.builder().binary(BinOp::Or, first_carry, second_carry, &name);
        Ok(self.values(node, &[Some(result), Some(carry)]))
    }

    pub(super) fn visit_count(
        &mut self,
        id: NodeId,
        node: &Node,
        intrinsic: Intrinsic,
        zero_undef: Option<bool>,
    ) -> LiftResult<NodeValues> {
        let Some(value) = self.operand(id, node, 0)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &[value]);
        let ty = self.func.type_of(value);
        let mut args = vec![value];
        args.extend(zero_undef.map(Value::bool));
        let name = self.fresh(&base);
        let mut count = self.builder().call(intrinsic, args, ty, &name);
        if let Some(result_ty) = node.value_type(0).and_then(|vt| vt.to_ir()) {
            count = self.coerce(count, result_ty, &base);
        }
        Ok(self.values(node, &[Some(count)]))
    }

    // Comparisons and selects.

    fn cond_code_operand(&self, id: NodeId, node: &Node, index: usize) -> Option<CondCode> {
        let cc = node.operand(index).and_then(|op| self.dag.node(op.node).cond_code());
        if cc.is_none() {
            self.report(DiagnosticKind::MissingOperand, id, format!("operand {index} is not a condition code"));
        }
        cc
    }

    /// Compare two values under `cc`, as `fcmp` for floats and `icmp` otherwise.
    pub(super) fn compare(&mut self, cc: CondCode, lhs: Value, rhs: Value, base: &str) -> Value {
        let ty = self.func.type_of(lhs);
        if ty.element().is_float() {
            let name = self.fresh(base);
            return self.builder().fcmp(float_predicate(cc), lhs, rhs, &name);
        }
        let Some(pred) = int_predicate(cc) else {
            return Value::bool(cc == CondCode::O);
        };
        let rhs = if ty.is_vector() { rhs } else { self.coerce(rhs, ty, base) };
        let name = self.fresh(base);
        self.builder().icmp(pred, lhs, rhs, &name)
    }

    /// Boolean result widened to the node's result type.
    fn widen_bool(&mut self, value: Value, node: &Node, base: &str) -> Value {
        let Some(ty) = node.value_type(0).and_then(|vt| vt.to_ir()) else {
            return value;
        };
        if ty.is_vector() && self.func.type_of(value) != ty {
            let name = self.fresh(base);
            return self.builder().cast(CastOp::SExt, value, ty, &name);
        }
        self.coerce(value, ty, base)
    }

    pub(super) fn visit_setcc(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let ops = self.operands(id, node, 0..2)?;
        let cc = self.cond_code_operand(id, node, 2);
        let (Some(ops), Some(cc)) = (ops, cc) else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let flag = self.compare(cc, ops[0], ops[1], &base);
        let value = self.widen_bool(flag, node, &base);
        Ok(self.values(node, &[Some(value)]))
    }

    pub(super) fn visit_select(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..3)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops[1..]);
        let cond = self.to_bool(ops[0], &base);
        let name = self.fresh(&base);
        let value = self.builder().select(cond, ops[1], ops[2], &name);
        Ok(self.values(node, &[Some(value)]))
    }

    pub(super) fn visit_select_cc(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let ops = self.operands(id, node, 0..4)?;
        let cc = self.cond_code_operand(id, node, 4);
        let (Some(ops), Some(cc)) = (ops, cc) else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let cond = self.compare(cc, ops[0], ops[1], &base);
        let name = self.fresh(&base);
        let value = self.builder().select(cond, ops[2], ops[3], &name);
        Ok(self.values(node, &[Some(value)]))
    }

    // Conversions.

    pub(super) fn visit_cast(&mut self, id: NodeId, node: &Node, op: CastOp) -> LiftResult<NodeValues> {
        let Some(value) = self.operand(id, node, 0)? else {
            return Ok(absent(node));
        };
        let Some(to) = self.result_type(id, node, 0) else {
            return Ok(absent(node));
        };
        if self.func.type_of(value) == to {
            return Ok(self.values(node, &[Some(value)]));
        }
        let base = self.base_for(id, &[value]);
        let name = self.fresh(&base);
        let value = self.builder().cast(op, value, to, &name);
        Ok(self.values(node, &[Some(value)]))
    }

    fn value_type_operand(&self, id: NodeId, node: &Node, index: usize) -> Option<Type> {
        let ty = node.operand(index).and_then(|op| match self.dag.node(op.node).payload {
            Payload::ValueType(vt) => vt.to_ir(),
            _ => None,
        });
        if ty.is_none() {
            self.report(DiagnosticKind::MissingOperand, id, format!("operand {index} is not a value type"));
        }
        ty
    }

    pub(super) fn visit_sext_inreg(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let value = self.operand(id, node, 0)?;
        let narrow = self.value_type_operand(id, node, 1);
        let (Some(value), Some(narrow)) = (value, narrow) else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &[value]);
        let ty = self.func.type_of(value);
        let name = self.fresh(&base);
        let truncated = self.builder().cast(CastOp::Trunc, value, narrow, &name);
        let name = self.fresh(&base);
        let extended = self.builder().cast(CastOp::SExt, truncated, ty, &name);
        Ok(self.values(node, &[Some(extended)]))
    }

    pub(super) fn visit_fp_round_inreg(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let value = self.operand(id, node, 0)?;
        let narrow = self.value_type_operand(id, node, 1);
        let (Some(value), Some(narrow)) = (value, narrow) else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &[value]);
        let ty = self.func.type_of(value);
        let name = self.fresh(&base);
        let rounded = self.builder().cast(CastOp::FpTrunc, value, narrow, &name);
        let name = self.fresh(&base);
        let extended = self.builder().cast(CastOp::FpExt, rounded, ty, &name);
        Ok(self.values(node, &[Some(extended)]))
    }

    /// Two halves joined into one integer, the second operand in the high bits.
    pub(super) fn visit_build_pair(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..2)? else {
            return Ok(absent(node));
        };
        let Some(ty) = self.result_type(id, node, 0) else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let half = self.func.type_of(ops[0]).bits();
        let low = self.coerce(ops[0], ty, &base);
        let high = self.coerce(ops[1], ty, &base);
        let name = self.fresh(&base);
        let shifted = self.builder().binary(BinOp::Shl, high, Value::const_int(ty, half as u64), &name);
        let name = self.fresh(&base);
        let value = self.builder().binary(BinOp::Or, low, shifted, &name);
        Ok(self.values(node, &[Some(value)]))
    }

    // Floating point.

    pub(super) fn visit_fneg(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(value) = self.operand(id, node, 0)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &[value]);
        let name = self.fresh(&base);
        let value = self.builder().fneg(value, &name);
        Ok(self.values(node, &[Some(value)]))
    }

    pub(super) fn visit_float_intrinsic(
        &mut self,
        id: NodeId,
        node: &Node,
        intrinsic: Intrinsic,
        arity: usize,
    ) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..arity)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let ty = self.func.type_of(ops[0]);
        let name = self.fresh(&base);
        let value = self.builder().call(intrinsic, ops, ty, &name);
        Ok(self.values(node, &[Some(value)]))
    }

    pub(super) fn visit_copysign(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..2)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let ty = self.func.type_of(ops[0]);
        let sign_ty = self.func.type_of(ops[1]);
        let mut sign = ops[1];
        if sign_ty != ty {
            let op = if sign_ty.bits() < ty.bits() { CastOp::FpExt } else { CastOp::FpTrunc };
            let name = self.fresh(&base);
            sign = self.builder().cast(op, sign, ty, &name);
        }
        let name = self.fresh(&base);
        let value = self.builder().call(Intrinsic::CopySign, vec![ops[0], sign], ty, &name);
        Ok(self.values(node, &[Some(value)]))
    }

    // Vectors.

    pub(super) fn visit_insert_element(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..3)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let elem_ty = self.func.type_of(ops[0]).element();
        let element = self.coerce(ops[1], elem_ty, &base);
        let name = self.fresh(&base);
        let value = self.builder().insert_element(ops[0], element, ops[2], &name);
        Ok(self.values(node, &[Some(value)]))
    }

    pub(super) fn visit_extract_element(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..2)? else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let name = self.fresh(&base);
        let mut value = self.builder().extract_element(ops[0], ops[1], &name);
        if let Some(ty) = node.value_type(0).and_then(|vt| vt.to_ir()) {
            value = self.coerce(value, ty, &base);
        }
        Ok(self.values(node, &[Some(value)]))
    }

    pub(super) fn visit_build_vector(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(elements) = self.operands(id, node, 0..node.operands.len())? else {
            return Ok(absent(node));
        };
        let Some(ty) = self.result_type(id, node, 0) else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &elements);
        let mut vector = Value::Undef(ty);
        for (lane, element) in elements.into_iter().enumerate() {
            let element = self.coerce(element, ty.element(), &base);
            let name = self.fresh(&base);
            vector = self.builder().insert_element(vector, element, Value::const_int(Type::I32, lane as u64), &name);
        }
        Ok(self.values(node, &[Some(vector)]))
    }

    /// Concatenate vectors by shuffling halves together.
    fn concat(&mut self, parts: &[Value], base: &str) -> Value {
        if parts.len() == 1 {
            return parts[0];
        }
        let (left, right) = parts.split_at(parts.len() / 2);
        let left = self.concat(left, base);
        let mut right = self.concat(right, base);
        let left_lanes = self.func.type_of(left).lanes().unwrap_or(1) as i32;
        let right_lanes = self.func.type_of(right).lanes().unwrap_or(1) as i32;
        if right_lanes != left_lanes {
            let padded: Vec<i32> = (0..left_lanes).map(|i| if i < right_lanes { i } else { -1 }).collect();
            let undef = Value::Undef(self.func.type_of(right));
            let name = self.fresh(base);
            right = self.builder().shuffle_vector(right, undef, padded, &name);
        }
        let mask: Vec<i32> = (0..left_lanes).chain(left_lanes..left_lanes + right_lanes).collect();
        let name = self.fresh(base);
        self.builder().shuffle_vector(left, right, mask, &name)
    }

    pub(super) fn visit_concat_vectors(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(parts) = self.operands(id, node, 0..node.operands.len())? else {
            return Ok(absent(node));
        };
        if parts.is_empty() {
            return Ok(absent(node));
        }
        let base = self.base_for(id, &parts);
        let value = self.concat(&parts, &base);
        Ok(self.values(node, &[Some(value)]))
    }

    pub(super) fn visit_extract_subvector(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(vector) = self.operand(id, node, 0)? else {
            return Ok(absent(node));
        };
        let start = node.operand(1).and_then(|op| self.dag.node(op.node).constant());
        let lanes = node.value_type(0).and_then(|vt| vt.to_ir()).and_then(Type::lanes);
        let (Some(start), Some(lanes)) = (start, lanes) else {
            self.report(DiagnosticKind::MissingOperand, id, "subvector needs a constant start and a vector result");
            return Ok(absent(node));
        };
        let base = self.base_for(id, &[vector]);
        let mask: Vec<i32> = (0..lanes as i32).map(|lane| start as i32 + lane).collect();
        let undef = Value::Undef(self.func.type_of(vector));
        let name = self.fresh(&base);
        let value = self.builder().shuffle_vector(vector, undef, mask, &name);
        Ok(self.values(node, &[Some(value)]))
    }

    pub(super) fn visit_vector_shuffle(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let Some(ops) = self.operands(id, node, 0..2)? else {
            return Ok(absent(node));
        };
        let Payload::ShuffleMask(mask) = &node.payload else {
            self.report(DiagnosticKind::MissingOperand, id, "shuffle without a lane mask");
            return Ok(absent(node));
        };
        let base = self.base_for(id, &ops);
        let name = self.fresh(&base);
        let value = self.builder().shuffle_vector(ops[0], ops[1], mask.clone(), &name);
        Ok(self.values(node, &[Some(value)]))
    }
}

/// Integer predicate for a condition code; `None` for the ordered/unordered tests.
fn int_predicate(cc: CondCode) -> Option<IntPredicate> {
    let pred = match cc {
        CondCode::Eq | CondCode::Ueq | CondCode::Oeq => IntPredicate::Eq,
        CondCode::Ne | CondCode::Une | CondCode::One => IntPredicate::Ne,
        CondCode::Lt | CondCode::Olt => IntPredicate::Slt,
        CondCode::Le | CondCode::Ole => IntPredicate::Sle,
        CondCode::Gt | CondCode::Ogt => IntPredicate::Sgt,
        CondCode::Ge | CondCode::Oge => IntPredicate::Sge,
        CondCode::Ult => IntPredicate::Ult,
        CondCode::Ule => IntPredicate::Ule,
        CondCode::Ugt => IntPredicate::Ugt,
        CondCode::Uge => IntPredicate::Uge,
        CondCode::O | CondCode::Uo => return None,
    };
    Some(pred)
}

fn float_predicate(cc: CondCode) -> FloatPredicate {
    match cc {
        CondCode::Eq | CondCode::Oeq => FloatPredicate::Oeq,
        CondCode::Ne | CondCode::Une => FloatPredicate::Une,
        CondCode::Lt | CondCode::Olt => FloatPredicate::Olt,
        CondCode::Le | CondCode::Ole => FloatPredicate::Ole,
        CondCode::Gt | CondCode::Ogt => FloatPredicate::Ogt,
        CondCode::Ge | CondCode::Oge => FloatPredicate::Oge,
        CondCode::One => FloatPredicate::One,
        CondCode::Ueq => FloatPredicate::Ueq,
        CondCode::Ult => FloatPredicate::Ult,
        CondCode::Ule => FloatPredicate::Ule,
        CondCode::Ugt => FloatPredicate::Ugt,
        CondCode::Uge => FloatPredicate::Uge,
        CondCode::O => FloatPredicate::Ord,
        CondCode::Uo => FloatPredicate::Uno,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_condition_codes_map_to_signed_predicates() {
        assert_eq!(int_predicate(CondCode::Lt), Some(IntPredicate::Slt));
        assert_eq!(int_predicate(CondCode::Ugt), Some(IntPredicate::Ugt));
        assert_eq!(int_predicate(CondCode::Uo), None);
        assert_eq!(float_predicate(CondCode::Ne), FloatPredicate::Une);
        assert_eq!(float_predicate(CondCode::Uo), FloatPredicate::Uno);
    }
}
