// Table-driven inverse patterns for the simple PowerPC instructions: each entry maps a
// machine opcode to the canonical node it is the selected form of, plus how its
// operands line up. These are the instructions whose forward selection is a single
// pattern, so inverting them is a relabelling and not a rewrite of the computation.

use super::invsel::{base_or_zero, effective_address};
use super::opcodes::PpcOpcode;
use crate::core::{DiagnosticKind, LiftResult, Rewrite};
use crate::dag::{LoadExt, MemOperand, NodeId, Opcode, SdValue, ValueType};
use crate::ir::value::truncate_bits;
use crate::lift::SelectCx;

/// How a machine node maps onto canonical nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// `opcode(op0, op1)`.
    Binary(Opcode),
    /// `opcode(op1, op0)`, for the subtract-from forms.
    BinarySwapped(Opcode),
    /// `opcode(op0, imm)` with a sign-extended immediate.
    BinaryImm(Opcode),
    /// `sub(0, op0)`.
    Negate,
    /// `sign_extend_inreg(op0, ValueType<vt>)`.
    ExtendInReg(ValueType),
    Unary(Opcode),
    /// Constant from an immediate.
    LoadImm,
    /// D-form load `(chain, D, RA)`.
    Load { size: u32, ext: LoadExt },
    /// Return through the link register.
    Return,
}

pub fn pattern(op: PpcOpcode) -> Option<Pattern> {
    use PpcOpcode::*;
    let pattern = match op {
        ADD4 | ADD8 => Pattern::Binary(Opcode::Add),
        ADDI | ADDI8 => Pattern::BinaryImm(Opcode::Add),
        SUBF | SUBF8 => Pattern::BinarySwapped(Opcode::Sub),
        NEG | NEG8 => Pattern::Negate,
        MULLW | MULLD => Pattern::Binary(Opcode::Mul),
        DIVW | DIVD => Pattern::Binary(Opcode::SDiv),
        DIVWU | DIVDU => Pattern::Binary(Opcode::UDiv),
        AND | AND8 => Pattern::Binary(Opcode::And),
        OR | OR8 => Pattern::Binary(Opcode::Or),
        XOR | XOR8 => Pattern::Binary(Opcode::Xor),
        SLW | SLD => Pattern::Binary(Opcode::Shl),
        SRW | SRD => Pattern::Binary(Opcode::Srl),
        SRAW | SRAD => Pattern::Binary(Opcode::Sra),
        EXTSB => Pattern::ExtendInReg(ValueType::I8),
        EXTSH => Pattern::ExtendInReg(ValueType::I16),
        EXTSW => Pattern::ExtendInReg(ValueType::I32),
        CNTLZW | CNTLZD => Pattern::Unary(Opcode::Ctlz),
        LI | LI8 => Pattern::LoadImm,
        LD => Pattern::Load { size: 8, ext: LoadExt::None },
        LWZ => Pattern::Load { size: 4, ext: LoadExt::Zext },
        LHZ => Pattern::Load { size: 2, ext: LoadExt::Zext },
        LHA => Pattern::Load { size: 2, ext: LoadExt::Sext },
        LBZ => Pattern::Load { size: 1, ext: LoadExt::Zext },
        BLR => Pattern::Return,
        STD | STW | STDU | STWU | B | BA | BL | BLA | RLDICL | RLDICR | RLWINM | RLWINM8 => return None,
    };
    Some(pattern)
}

/// Apply the table pattern of `op` to node `id`; nodes without one stay in place.
pub fn select_pattern(cx: &mut SelectCx<'_, '_>, id: NodeId, op: PpcOpcode) -> LiftResult<Rewrite> {
    let Some(pattern) = pattern(op) else {
        cx.report(
            DiagnosticKind::NoInversePattern,
            id,
            format!("no inverse pattern for {}, left in place", op.name()),
        );
        return Ok(Rewrite::Unchanged);
    };
    let name = op.name();
    let node = cx.dag.node(id);
    let vt = node.value_type(0).unwrap_or(ValueType::I64);
    let loc = node.loc;

    let replacement: SdValue = match pattern {
        Pattern::Binary(opcode) => {
            let ops = cx.expect_shape(id, name, 2, 1)?;
            cx.dag.get_node(opcode, &[vt], &ops, loc).into()
        }
        Pattern::BinarySwapped(opcode) => {
            let ops = cx.expect_shape(id, name, 2, 1)?;
            cx.dag.get_node(opcode, &[vt], &[ops[1], ops[0]], loc).into()
        }
        Pattern::BinaryImm(opcode) => {
            let ops = cx.expect_shape(id, name, 2, 1)?;
            let imm = cx.immediate(id, name, ops[1])?;
            let imm = cx.dag.get_constant(truncate_bits(imm as u64, vt.bits()), vt);
            cx.dag.get_node(opcode, &[vt], &[ops[0], imm], loc).into()
        }
        Pattern::Negate => {
            let ops = cx.expect_shape(id, name, 1, 1)?;
            let zero = cx.dag.get_constant(0, vt);
            cx.dag.get_node(Opcode::Sub, &[vt], &[zero, ops[0]], loc).into()
        }
        Pattern::ExtendInReg(from) => {
            let ops = cx.expect_shape(id, name, 1, 1)?;
            let from = cx.dag.get_value_type(from);
            cx.dag.get_node(Opcode::SignExtendInReg, &[vt], &[ops[0], from], loc).into()
        }
        Pattern::Unary(opcode) => {
            let ops = cx.expect_shape(id, name, 1, 1)?;
            cx.dag.get_node(opcode, &[vt], &ops, loc).into()
        }
        Pattern::LoadImm => {
            let ops = cx.expect_shape(id, name, 1, 1)?;
            let imm = cx.immediate(id, name, ops[0])?;
            cx.dag.get_constant(truncate_bits(imm as u64, vt.bits()), vt)
        }
        Pattern::Load { size, ext } => return select_load(cx, id, op, size, ext),
        Pattern::Return => {
            let ops = cx.expect_shape(id, name, 1, 1)?;
            cx.dag.get_node(Opcode::Ret, &[ValueType::Other], &ops, loc).into()
        }
    };

    cx.replace(id, 0, replacement);
    Ok(Rewrite::Replaced)
}

/// D-form loads: `(chain, D, RA)` producing `(value, chain)`.
fn select_load(cx: &mut SelectCx<'_, '_>, id: NodeId, op: PpcOpcode, size: u32, ext: LoadExt) -> LiftResult<Rewrite> {
    let ops = cx.expect_shape(id, op.name(), 3, 2)?;
    let (chain, disp, ra) = (ops[0], ops[1], ops[2]);
    let node = cx.dag.node(id);
    let vt = node.value_type(0).unwrap_or(ValueType::I64);
    let loc = node.loc;

    let mut mem = match node.mem {
        Some(mem) => mem,
        None => {
            cx.report(
                DiagnosticKind::MissingMemOperand,
                id,
                format!("{} without memory operand, assuming {size} bytes", op.name()),
            );
            MemOperand::load(size)
        }
    };
    mem.ext = ext;

    let base = base_or_zero(cx, ra);
    let ea = effective_address(cx, id, op.name(), disp, base)?;
    let load = cx.dag.get_load(vt, chain, ea, mem, loc);
    cx.replace(id, 0, SdValue::new(load, 0));
    cx.replace(id, 1, SdValue::new(load, 1));
    Ok(Rewrite::Replaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_encodings_have_no_table_entry() {
        assert_eq!(pattern(PpcOpcode::STDU), None);
        assert_eq!(pattern(PpcOpcode::RLWINM8), None);
        assert_eq!(pattern(PpcOpcode::SUBF), Some(Pattern::BinarySwapped(Opcode::Sub)));
        assert_eq!(pattern(PpcOpcode::LHA), Some(Pattern::Load { size: 2, ext: LoadExt::Sext }));
    }
}
