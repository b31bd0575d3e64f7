//! PowerPC-64 target description.
//!
//! This module contains everything specific to 64-bit PowerPC:
//! - the machine opcode table the decoder's graphs refer to
//! - the register file and its global-storage names
//! - the inverse selector for composite encodings, with a table of simple patterns

pub mod invsel;
pub mod opcodes;
pub mod patterns;
pub mod registers;

pub use invsel::{mask32, mask64, PpcInverseSelector};
pub use opcodes::PpcOpcode;
pub use registers::PpcRegisterInfo;

use crate::core::{InverseSelector, RegisterInfo, Target};

/// The `ppc64` target.
#[derive(Debug, Clone, Default)]
pub struct PowerPc64 {
    regs: PpcRegisterInfo,
}

impl PowerPc64 {
    pub fn new() -> Self {
        Self { regs: PpcRegisterInfo::new() }
    }
}

impl Target for PowerPc64 {
    fn name(&self) -> &str {
        "ppc64"
    }

    fn register_info(&self) -> &dyn RegisterInfo {
        &self.regs
    }

    fn machine_opcode_name(&self, raw: u16) -> Option<&str> {
        PpcOpcode::from_raw(raw).map(PpcOpcode::name)
    }

    fn machine_opcode(&self, name: &str) -> Option<u16> {
        PpcOpcode::from_name(name).map(PpcOpcode::raw)
    }

    fn selector(&self) -> Box<dyn InverseSelector + '_> {
        Box::new(PpcInverseSelector)
    }
}
