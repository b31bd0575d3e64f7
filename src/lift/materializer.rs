// Register materialization. Architectural registers are modelled as memory: each register
// a function touches gets a stack slot, created on first reference and initialized at the
// function entry from a module global that holds the register's value across function
// boundaries. At every return the slots are written back to their globals. Within a
// function all reads and writes of a register therefore go through its slot, and
// cross-function continuity exists only through the globals.

//! Register slots and their backing globals.

use crate::core::{Diagnostic, DiagnosticKind, LiftSession, RegisterInfo};
use crate::dag::Reg;
use crate::ir::{BlockId, DebugLoc, Function, InstId, IrBuilder, Module, Type, Value};
use super::context::NameResolver;
use thiserror::Error;

/// Why a register operand could not be materialized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("register operand is the no-register sentinel")]
    NoRegister,

    #[error("register index {index} is outside the {count} registers of the target")]
    OutOfRange { index: u32, count: usize },

    #[error("register index {0} has no name")]
    Unnamed(u32),

    #[error("register {0} has no data type")]
    Untyped(String),
}

/// Everything materialization touches besides its own slot map.
pub struct RegisterScope<'s> {
    pub reg_info: &'s dyn RegisterInfo,
    pub module: &'s mut Module,
    pub func: &'s mut Function,
    pub names: &'s mut NameResolver,
}

/// Per-function map from register index to its stack slot.
#[derive(Debug, Clone)]
pub struct RegisterMaterializer {
    slots: Vec<Option<InstId>>,
}

impl RegisterMaterializer {
    pub fn new(num_regs: usize) -> Self {
        Self { slots: vec![None; num_regs] }
    }

    pub fn slot(&self, reg: Reg) -> Option<InstId> {
        self.slots.get(reg.index()).copied().flatten()
    }

    /// Registers that currently have a slot, in ascending index order.
    pub fn materialized(&self) -> impl Iterator<Item = (Reg, InstId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|s| (Reg(i as u32), s)))
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Slot of `reg`, creating it at the end of `entry` on first use.
    ///
    /// Creation declares the register's global if needed (zero-initialized) and
    /// inserts `alloca`, a load of the global, and a store into the slot.
    pub fn materialize(
        &mut self,
        reg: Reg,
        scope: RegisterScope<'_>,
        entry: BlockId,
    ) -> Result<InstId, RegisterError> {
        if reg.is_none() {
            return Err(RegisterError::NoRegister);
        }
        if !scope.reg_info.is_valid(reg) || reg.index() >= self.slots.len() {
            return Err(RegisterError::OutOfRange { index: reg.0, count: scope.reg_info.num_regs() });
        }
        if let Some(slot) = self.slot(reg) {
            return Ok(slot);
        }

        let name = scope.reg_info.reg_name(reg).ok_or(RegisterError::Unnamed(reg.0))?.to_string();
        let ty: Type = scope
            .reg_info
            .reg_type(reg)
            .and_then(|vt| vt.to_ir())
            .ok_or_else(|| RegisterError::Untyped(name.clone()))?;

        let global = scope.module.add_global(&name, ty, Value::zero(ty));
        let slot_name = scope.names.indexed_name(scope.func.symbols_mut(), &name);
        let init_name = scope.names.indexed_name(scope.func.symbols_mut(), &name);

        let mut b = IrBuilder::before_terminator(&mut *scope.func, entry);
        let slot = b.alloca(ty, &slot_name);
        let init = b.load(ty, Value::Global(global), false, &init_name);
        b.store(init, Value::Inst(slot), false);

        log::trace!("materialized register {name} as %{slot_name}");
        self.slots[reg.index()] = Some(slot);
        Ok(slot)
    }

    /// Write every slot back to its global ahead of the terminator of `block`.
    pub fn flush(
        &self,
        scope: RegisterScope<'_>,
        block: BlockId,
        loc: Option<DebugLoc>,
        session: &LiftSession<'_>,
    ) {
        for (reg, slot) in self.materialized() {
            let name = scope.reg_info.reg_name(reg).unwrap_or_default().to_string();
            let Some(global) = scope.module.global(&name) else {
                session.report(Diagnostic::new(
                    DiagnosticKind::MissingGlobal,
                    None,
                    format!("register slot for '{name}' has no global to flush to"),
                ));
                continue;
            };
            let Some(ty) = scope.func.allocated_type(slot) else {
                continue;
            };

            let value_name = scope.names.indexed_name(scope.func.symbols_mut(), &name);
            let mut b = IrBuilder::before_terminator(&mut *scope.func, block).with_loc(loc);
            let value = b.load(ty, Value::Inst(slot), false, &value_name);
            b.store(value, Value::Global(global), false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::ValueType;
    use crate::ir::{Destination, InstKind};

    struct TwoRegs;

    impl RegisterInfo for TwoRegs {
        fn num_regs(&self) -> usize {
            3
        }

        fn reg_name(&self, reg: Reg) -> Option<&str> {
            match reg.0 {
                1 => Some("A"),
                2 => Some("B"),
                _ => None,
            }
        }

        fn reg_type(&self, reg: Reg) -> Option<ValueType> {
            (reg.0 == 1 || reg.0 == 2).then_some(ValueType::I64)
        }
    }

    fn function_with_entry() -> (Function, BlockId) {
        let mut func = Function::new("f");
        let entry = func.add_block("entry");
        let body = func.add_block("body");
        IrBuilder::at_end(&mut func, entry).br(Destination::Block(body));
        (func, entry)
    }

    #[test]
    fn test_materialize_once_per_register() {
        let mut module = Module::new("m");
        let (mut func, entry) = function_with_entry();
        let mut names = NameResolver::default();
        let mut regs = RegisterMaterializer::new(3);

        let first = regs
            .materialize(Reg(1), RegisterScope { reg_info: &TwoRegs, module: &mut module, func: &mut func, names: &mut names }, entry)
            .unwrap();
        let second = regs
            .materialize(Reg(1), RegisterScope { reg_info: &TwoRegs, module: &mut module, func: &mut func, names: &mut names }, entry)
            .unwrap();
        assert_eq!(first, second);

        assert_eq!(module.globals().len(), 1);
        assert_eq!(func.block(entry).insts.len(), 4);
        assert_eq!(func.inst(first).name, "A");
        assert!(matches!(func.inst(first).kind, InstKind::Alloca { allocated: Type::I64 }));
    }

    #[test]
    fn test_invalid_registers_are_rejected() {
        let mut module = Module::new("m");
        let (mut func, entry) = function_with_entry();
        let mut names = NameResolver::default();
        let mut regs = RegisterMaterializer::new(3);

        let none = regs.materialize(
            Reg::NONE,
            RegisterScope { reg_info: &TwoRegs, module: &mut module, func: &mut func, names: &mut names },
            entry,
        );
        assert_eq!(none, Err(RegisterError::NoRegister));
        let out_of_range = regs.materialize(
            Reg(7),
            RegisterScope { reg_info: &TwoRegs, module: &mut module, func: &mut func, names: &mut names },
            entry,
        );
        assert_eq!(out_of_range, Err(RegisterError::OutOfRange { index: 7, count: 3 }));
        assert!(module.globals().is_empty());
    }
}
