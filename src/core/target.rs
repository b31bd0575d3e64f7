// This module defines the seams between the generic lifter and a target description.
// RegisterInfo answers the register questions the materializer asks (how many registers
// exist, what each is called and what type it holds, which ones are hard-wired to zero).
// Target bundles the register description with the machine opcode table and hands out
// the target's reverse instruction selector. The selector itself is one trait method,
// transmogrify, invoked on every live node of a graph before emission.

//! Target description traits.

use super::error::LiftResult;
use crate::dag::{NodeId, Opcode, Reg, ValueType};
use crate::lift::SelectCx;

/// Register description of a target architecture.
pub trait RegisterInfo {
    /// Size of the dense register numbering space, the sentinel at index 0 included.
    fn num_regs(&self) -> usize;

    fn reg_name(&self, reg: Reg) -> Option<&str>;

    /// Semantic type of the register's contents.
    fn reg_type(&self, reg: Reg) -> Option<ValueType>;

    /// Registers that always read as zero.
    fn is_zero_reg(&self, _reg: Reg) -> bool {
        false
    }

    /// Register written with the return address by call forms.
    fn link_register(&self) -> Option<Reg> {
        None
    }

    fn is_valid(&self, reg: Reg) -> bool {
        !reg.is_none() && reg.index() < self.num_regs()
    }

    fn find_reg(&self, name: &str) -> Option<Reg> {
        (1..self.num_regs() as u32)
            .map(Reg)
            .find(|&reg| self.reg_name(reg) == Some(name))
    }
}

/// Outcome of running the inverse selector on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// The node stays as it is.
    Unchanged,
    /// All uses were redirected to new canonical nodes; the node is dead.
    Replaced,
}

/// Rewrites target machine nodes into canonical nodes.
pub trait InverseSelector {
    fn transmogrify(&mut self, cx: &mut SelectCx<'_, '_>, id: NodeId) -> LiftResult<Rewrite>;
}

/// A target architecture as the lifter sees it.
pub trait Target {
    fn name(&self) -> &str;

    fn register_info(&self) -> &dyn RegisterInfo;

    fn machine_opcode_name(&self, raw: u16) -> Option<&str>;

    /// Look up a machine opcode by its mnemonic.
    fn machine_opcode(&self, name: &str) -> Option<u16>;

    fn selector(&self) -> Box<dyn InverseSelector + '_>;

    /// Printable name of any opcode, canonical or machine.
    fn opcode_name(&self, opcode: Opcode) -> String {
        match opcode {
            Opcode::Machine(raw) => match self.machine_opcode_name(raw) {
                Some(name) => name.to_string(),
                None => opcode.to_string(),
            },
            canonical => canonical.to_string(),
        }
    }
}
