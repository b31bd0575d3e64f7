// The PowerPC-64 register file as the lifter numbers it. Index 0 is the "no register"
// sentinel; then come the two hard-wired zero registers, the 32-bit and 64-bit views of
// the general purpose registers, the floating-point registers, the condition register
// fields and the special registers. Names double as the names of the module globals
// that carry register values between functions.

use crate::core::RegisterInfo;
use crate::dag::{Reg, ValueType};
use hashbrown::HashMap;

pub const ZERO: Reg = Reg(1);
pub const ZERO8: Reg = Reg(2);
const GPR32_BASE: u32 = 3;
const GPR64_BASE: u32 = GPR32_BASE + 32;
const FPR_BASE: u32 = GPR64_BASE + 32;
const CR_BASE: u32 = FPR_BASE + 32;
pub const LR: Reg = Reg(CR_BASE + 8);
pub const LR8: Reg = Reg(CR_BASE + 9);
pub const CTR: Reg = Reg(CR_BASE + 10);
pub const CTR8: Reg = Reg(CR_BASE + 11);
pub const XER: Reg = Reg(CR_BASE + 12);
pub const NUM_REGS: usize = (CR_BASE + 13) as usize;

/// 32-bit view `Rn` of a general purpose register.
pub fn gpr32(n: u32) -> Reg {
    debug_assert!(n < 32);
    Reg(GPR32_BASE + n)
}

/// 64-bit view `Xn` of a general purpose register.
pub fn gpr64(n: u32) -> Reg {
    debug_assert!(n < 32);
    Reg(GPR64_BASE + n)
}

pub fn fpr(n: u32) -> Reg {
    debug_assert!(n < 32);
    Reg(FPR_BASE + n)
}

pub fn cr(n: u32) -> Reg {
    debug_assert!(n < 8);
    Reg(CR_BASE + n)
}

#[derive(Debug, Clone)]
pub struct PpcRegisterInfo {
    regs: Vec<Option<(String, ValueType)>>,
    by_name: HashMap<String, Reg>,
}

impl PpcRegisterInfo {
    pub fn new() -> Self {
        let mut regs: Vec<Option<(String, ValueType)>> = Vec::with_capacity(NUM_REGS);
        regs.push(None);
        regs.push(Some(("ZERO".to_string(), ValueType::I32)));
        regs.push(Some(("ZERO8".to_string(), ValueType::I64)));
        regs.extend((0..32).map(|n| Some((format!("R{n}"), ValueType::I32))));
        regs.extend((0..32).map(|n| Some((format!("X{n}"), ValueType::I64))));
        regs.extend((0..32).map(|n| Some((format!("F{n}"), ValueType::F64))));
        regs.extend((0..8).map(|n| Some((format!("CR{n}"), ValueType::I32))));
        for (name, vt) in [
            ("LR", ValueType::I32),
            ("LR8", ValueType::I64),
            ("CTR", ValueType::I32),
            ("CTR8", ValueType::I64),
            ("XER", ValueType::I32),
        ] {
            regs.push(Some((name.to_string(), vt)));
        }
        debug_assert_eq!(regs.len(), NUM_REGS);

        let by_name = regs
            .iter()
            .enumerate()
            .filter_map(|(i, reg)| reg.as_ref().map(|(name, _)| (name.clone(), Reg(i as u32))))
            .collect();
        Self { regs, by_name }
    }
}

impl Default for PpcRegisterInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterInfo for PpcRegisterInfo {
    fn num_regs(&self) -> usize {
        self.regs.len()
    }

    fn reg_name(&self, reg: Reg) -> Option<&str> {
        self.regs.get(reg.index())?.as_ref().map(|(name, _)| name.as_str())
    }

    fn reg_type(&self, reg: Reg) -> Option<ValueType> {
        self.regs.get(reg.index())?.as_ref().map(|&(_, vt)| vt)
    }

    fn is_zero_reg(&self, reg: Reg) -> bool {
        reg == ZERO || reg == ZERO8
    }

    fn link_register(&self) -> Option<Reg> {
        Some(LR8)
    }

    fn find_reg(&self, name: &str) -> Option<Reg> {
        self.by_name.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_numbering() {
        let info = PpcRegisterInfo::new();
        assert_eq!(info.num_regs(), NUM_REGS);
        assert_eq!(info.reg_name(Reg::NONE), None);
        assert_eq!(info.reg_name(gpr64(3)), Some("X3"));
        assert_eq!(info.reg_type(gpr64(3)), Some(ValueType::I64));
        assert_eq!(info.reg_name(gpr32(31)), Some("R31"));
        assert_eq!(info.reg_type(fpr(1)), Some(ValueType::F64));
        assert_eq!(info.reg_name(cr(7)), Some("CR7"));
        assert_eq!(info.reg_name(LR8), Some("LR8"));
        assert_eq!(info.reg_name(XER), Some("XER"));
        assert_eq!(info.reg_name(Reg(NUM_REGS as u32)), None);
    }

    #[test]
    fn test_lookup_by_name() {
        let info = PpcRegisterInfo::new();
        assert_eq!(info.find_reg("X1"), Some(gpr64(1)));
        assert_eq!(info.find_reg("CTR8"), Some(CTR8));
        assert_eq!(info.find_reg("x1"), None);
        assert!(info.is_zero_reg(ZERO8));
        assert!(!info.is_zero_reg(gpr64(0)));
    }
}
