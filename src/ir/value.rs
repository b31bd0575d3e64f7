// Value handles for the output IR. Instructions, blocks and globals live in dense vectors
// owned by their Function or Module and are addressed by small index newtypes. A Value is
// either one of those handles or an inline literal, which keeps operands Copy and lets the
// emitter cache them per graph node without lifetimes.

//! IR value handles.

use super::types::Type;

/// Index of an instruction inside its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

/// Index of a basic block inside its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Index of a module-scope global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(pub u32);

impl InstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl GlobalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An operand of an IR instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Result of an instruction in the current function.
    Inst(InstId),
    /// Address of a module global.
    Global(GlobalId),
    /// Integer literal; `bits` holds the two's complement pattern.
    ConstInt { ty: Type, bits: u64 },
    ConstFloat { ty: Type, value: f64 },
    Undef(Type),
}

impl Value {
    pub fn const_int(ty: Type, bits: u64) -> Value {
        Value::ConstInt { ty, bits: truncate_bits(bits, ty.bits()) }
    }

    pub fn bool(flag: bool) -> Value {
        Value::ConstInt { ty: Type::I1, bits: flag as u64 }
    }

    /// The all-zero literal of `ty`, used for register globals and sentinel replacement.
    pub fn zero(ty: Type) -> Value {
        match ty {
            Type::F32 | Type::F64 => Value::ConstFloat { ty, value: 0.0 },
            Type::Void => Value::Undef(ty),
            Type::Int(_) | Type::Ptr | Type::Vector { .. } => Value::ConstInt { ty, bits: 0 },
        }
    }

    pub fn as_inst(self) -> Option<InstId> {
        match self {
            Value::Inst(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_constant(self) -> bool {
        matches!(self, Value::ConstInt { .. } | Value::ConstFloat { .. } | Value::Undef(_))
    }
}

/// Keep only the low `width` bits of `bits`.
pub fn truncate_bits(bits: u64, width: u32) -> u64 {
    if width == 0 || width >= 64 {
        bits
    } else {
        bits & ((1u64 << width) - 1)
    }
}

/// Interpret the low `width` bits of `bits` as a signed number.
pub fn sign_extend_bits(bits: u64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        bits as i64
    } else {
        let shift = 64 - width;
        ((bits << shift) as i64) >> shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_int_is_truncated() {
        assert_eq!(
            Value::const_int(Type::I8, 0x1ff),
            Value::ConstInt { ty: Type::I8, bits: 0xff }
        );
    }

    #[test]
    fn test_sign_extend_bits() {
        assert_eq!(sign_extend_bits(0xfff8, 16), -8);
        assert_eq!(sign_extend_bits(0x7fff, 16), 0x7fff);
        assert_eq!(sign_extend_bits(u64::MAX, 64), -1);
    }
}
