// Reverse instruction selection for PowerPC-64. Composite encodings are expanded here
// into the canonical nodes they stand for: D-form stores become an explicit effective
// address computation and a plain store (update forms also yield the new base), branches
// become canonical branches to a normalized target, and rotate-and-mask instructions
// become a rotate followed by an `and` with the mask the encoded bounds describe.
// Anything else goes through the pattern table in patterns.rs. Every replacement keeps
// the original node's chain and debug location, so memory operations and branches are
// emitted in the same order as before.

//! PowerPC-64 inverse selector.

use super::opcodes::PpcOpcode;
use super::patterns::select_pattern;
use crate::core::{DiagnosticKind, InverseSelector, LiftResult, Rewrite};
use crate::dag::{MemOperand, NodeId, Opcode, Payload, SdValue, ValueType};
use crate::ir::Destination;
use crate::lift::{fixup_canonical, SelectCx};

/// Ones from big-endian bit `mb` through bit `me` of a doubleword, wrapping if `mb > me`.
pub fn mask64(mb: u32, me: u32) -> u64 {
    debug_assert!(mb < 64 && me < 64);
    let begin = u64::MAX >> mb;
    let end = u64::MAX << (63 - me);
    if mb <= me {
        begin & end
    } else {
        begin | end
    }
}

/// Word variant of [`mask64`].
pub fn mask32(mb: u32, me: u32) -> u32 {
    debug_assert!(mb < 32 && me < 32);
    let begin = u32::MAX >> mb;
    let end = u32::MAX << (31 - me);
    if mb <= me {
        begin & end
    } else {
        begin | end
    }
}

#[derive(Debug, Default)]
pub struct PpcInverseSelector;

impl InverseSelector for PpcInverseSelector {
    fn transmogrify(&mut self, cx: &mut SelectCx<'_, '_>, id: NodeId) -> LiftResult<Rewrite> {
        let opcode = cx.dag.node(id).opcode;
        let Opcode::Machine(raw) = opcode else {
            return fixup_canonical(cx, id);
        };
        let Some(op) = PpcOpcode::from_raw(raw) else {
            cx.report(DiagnosticKind::NoInversePattern, id, format!("unknown machine opcode #{raw}"));
            return Ok(Rewrite::Unchanged);
        };

        match op {
            PpcOpcode::STD => select_store(cx, id, op, 8, false),
            PpcOpcode::STW => select_store(cx, id, op, 4, false),
            PpcOpcode::STDU => select_store(cx, id, op, 8, true),
            PpcOpcode::STWU => select_store(cx, id, op, 4, true),
            PpcOpcode::B => select_branch(cx, id, op, false, false),
            PpcOpcode::BA => select_branch(cx, id, op, true, false),
            PpcOpcode::BL => select_branch(cx, id, op, false, true),
            PpcOpcode::BLA => select_branch(cx, id, op, true, true),
            PpcOpcode::RLDICL => select_rldic(cx, id, op, true),
            PpcOpcode::RLDICR => select_rldic(cx, id, op, false),
            PpcOpcode::RLWINM | PpcOpcode::RLWINM8 => select_rlwinm(cx, id, op),
            _ => select_pattern(cx, id, op),
        }
    }
}

/// Base register operand of a D-form access; `(RA|0)` reads a literal zero for the
/// sentinel and the zero registers.
pub(super) fn base_or_zero(cx: &mut SelectCx<'_, '_>, ra: SdValue) -> SdValue {
    let node = cx.dag.node(ra.node);
    if node.opcode == Opcode::Register {
        if let Some(reg) = node.register() {
            if reg.is_none() || cx.reg_info.is_zero_reg(reg) {
                return cx.dag.get_constant(0, ValueType::I64);
            }
        }
    }
    ra
}

/// `EA = add(sext D, base)`.
pub(super) fn effective_address(
    cx: &mut SelectCx<'_, '_>,
    id: NodeId,
    name: &str,
    disp: SdValue,
    base: SdValue,
) -> LiftResult<SdValue> {
    let displacement = cx.immediate(id, name, disp)?;
    let loc = cx.dag.node(id).loc;
    let offset = cx.dag.get_constant(displacement as u64, ValueType::I64);
    Ok(cx.dag.get_node(Opcode::Add, &[ValueType::I64], &[offset, base], loc).into())
}

/// `STD`/`STW` and their update forms: `(chain, RS, D, RA)`.
fn select_store(
    cx: &mut SelectCx<'_, '_>,
    id: NodeId,
    op: PpcOpcode,
    size: u32,
    update: bool,
) -> LiftResult<Rewrite> {
    let results = if update { 2 } else { 1 };
    let ops = cx.expect_shape(id, op.name(), 4, results)?;
    let (chain, rs, disp, ra) = (ops[0], ops[1], ops[2], ops[3]);

    let mut mem = match cx.dag.node(id).mem {
        Some(mem) => mem,
        None => {
            cx.report(
                DiagnosticKind::MissingMemOperand,
                id,
                format!("{} without memory operand, assuming {size} bytes", op.name()),
            );
            MemOperand::store(size)
        }
    };
    mem.truncating = cx.value_type(rs).bits() > mem.bits();

    let base = if update { ra } else { base_or_zero(cx, ra) };
    let ea = effective_address(cx, id, op.name(), disp, base)?;
    let loc = cx.dag.node(id).loc;
    let store = cx.dag.get_store(chain, rs, ea, mem, loc);

    if update {
        cx.replace(id, 0, ea);
        cx.replace(id, 1, store);
    } else {
        cx.replace(id, 0, store);
    }
    Ok(Rewrite::Replaced)
}

fn branch_destination(
    cx: &SelectCx<'_, '_>,
    id: NodeId,
    op: PpcOpcode,
    target: SdValue,
    absolute: bool,
) -> LiftResult<Destination> {
    let address = cx.dag.node(id).loc.map(|loc| loc.address);
    let target_node = cx.dag.node(target.node);
    if let Payload::Target(dest) = target_node.payload {
        return Ok(match (dest, address) {
            (Destination::Relative(disp), Some(addr)) if !absolute => {
                Destination::Address(addr.wrapping_add_signed(disp))
            }
            _ => dest,
        });
    }

    let disp = cx.immediate(id, op.name(), target)?;
    Ok(match (absolute, address) {
        (true, _) => Destination::Address(disp as u64),
        (false, Some(addr)) => Destination::Address(addr.wrapping_add_signed(disp)),
        (false, None) => Destination::Relative(disp),
    })
}

/// `B`, `BA`, `BL`, `BLA`: `(chain, target)`. Link forms write the return address to
/// the link register ahead of the branch when the instruction address is known.
fn select_branch(
    cx: &mut SelectCx<'_, '_>,
    id: NodeId,
    op: PpcOpcode,
    absolute: bool,
    link: bool,
) -> LiftResult<Rewrite> {
    let ops = cx.expect_shape(id, op.name(), 2, 1)?;
    let (mut chain, target) = (ops[0], ops[1]);
    let dest = branch_destination(cx, id, op, target, absolute)?;
    let loc = cx.dag.node(id).loc;

    if link {
        match (cx.reg_info.link_register(), loc) {
            (Some(lr), Some(loc)) => {
                let ret = cx.dag.get_constant(loc.address.wrapping_add(4), ValueType::I64);
                chain = cx.dag.get_copy_to_reg(chain, lr, ret, Some(loc));
            }
            _ => log::debug!("{id}: {} without address, link register not written", op.name()),
        }
    }

    let target = cx.dag.get_target_address(dest);
    let br = cx.dag.get_node(Opcode::Br, &[ValueType::Other], &[chain, target], loc);
    cx.replace(id, 0, br.into());
    Ok(Rewrite::Replaced)
}

/// `RLDICL` (`MASK(MB, 63)`) and `RLDICR` (`MASK(0, ME)`): `(RS, SH, MB|ME)`.
fn select_rldic(cx: &mut SelectCx<'_, '_>, id: NodeId, op: PpcOpcode, clear_left: bool) -> LiftResult<Rewrite> {
    let ops = cx.expect_shape(id, op.name(), 3, 1)?;
    let sh = cx.bounded_immediate(id, op.name(), ops[1], 64)?;
    let bound = cx.bounded_immediate(id, op.name(), ops[2], 64)?;
    let mask = if clear_left { mask64(bound, 63) } else { mask64(0, bound) };
    log::trace!("{id}: {} rotate {sh}, mask {mask:#018x}", op.name());
    let loc = cx.dag.node(id).loc;

    let vt = ValueType::I64;
    let amount = cx.dag.get_constant(sh as u64, vt);
    let rotated = cx.dag.get_node(Opcode::Rotl, &[vt], &[ops[0], amount], loc);
    let mask = cx.dag.get_constant(mask, vt);
    let result = cx.dag.get_node(Opcode::And, &[vt], &[rotated.into(), mask], loc);
    cx.replace(id, 0, result.into());
    Ok(Rewrite::Replaced)
}

/// `RLWINM` and `RLWINM8`: `(RS, SH, MB, ME)`, a 32-bit rotate of the low word. The
/// doubleword form sees the rotated word replicated into both halves before masking.
fn select_rlwinm(cx: &mut SelectCx<'_, '_>, id: NodeId, op: PpcOpcode) -> LiftResult<Rewrite> {
    let ops = cx.expect_shape(id, op.name(), 4, 1)?;
    let sh = cx.bounded_immediate(id, op.name(), ops[1], 32)?;
    let mb = cx.bounded_immediate(id, op.name(), ops[2], 32)?;
    let me = cx.bounded_immediate(id, op.name(), ops[3], 32)?;
    let loc = cx.dag.node(id).loc;
    let (word_vt, dword_vt) = (ValueType::I32, ValueType::I64);

    let mut word = ops[0];
    if cx.value_type(word).bits() > 32 {
        word = cx.dag.get_node(Opcode::Truncate, &[word_vt], &[word], loc).into();
    }
    let amount = cx.dag.get_constant(sh as u64, word_vt);
    let rotated: SdValue = cx.dag.get_node(Opcode::Rotl, &[word_vt], &[word, amount], loc).into();

    let result = if op == PpcOpcode::RLWINM8 {
        let doubled = cx.dag.get_node(Opcode::BuildPair, &[dword_vt], &[rotated, rotated], loc);
        let mask = cx.dag.get_constant(mask64(mb + 32, me + 32), dword_vt);
        cx.dag.get_node(Opcode::And, &[dword_vt], &[doubled.into(), mask], loc)
    } else {
        let mask = cx.dag.get_constant(mask32(mb, me) as u64, word_vt);
        cx.dag.get_node(Opcode::And, &[word_vt], &[rotated, mask], loc)
    };
    cx.replace(id, 0, result.into());
    Ok(Rewrite::Replaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask64_clear_left_has_expected_population() {
        for b in 0..64 {
            let mask = mask64(b, 63);
            assert_eq!(mask.count_ones(), 64 - b, "bound {b}");
            assert_eq!(mask & 1, 1, "run must end at bit 63");
        }
        assert_eq!(mask64(0, 63), u64::MAX);
        assert_eq!(mask64(32, 63), 0xFFFF_FFFF);
    }

    #[test]
    fn test_mask64_clear_right_and_wraparound() {
        assert_eq!(mask64(0, 0), 0x8000_0000_0000_0000);
        assert_eq!(mask64(0, 31), 0xFFFF_FFFF_0000_0000);
        assert_eq!(mask64(63, 0), 0x8000_0000_0000_0001);
        assert_eq!(mask64(60, 3), 0xF000_0000_0000_000F);
        assert_eq!(mask64(5, 5), 1 << 58);
    }

    #[test]
    fn test_mask32() {
        assert_eq!(mask32(0, 31), u32::MAX);
        assert_eq!(mask32(16, 31), 0xFFFF);
        assert_eq!(mask32(24, 7), 0xFF00_00FF);
        assert_eq!(mask32(31, 31), 1);
    }
}
