// Generic driver for reverse instruction selection. The target's InverseSelector is run
// once over every live node in a topological snapshot of the graph; a node it replaces
// is marked dead after all of its uses have been redirected to the new canonical nodes.
// SelectCx is what a selector works with: the mutable graph, the session for
// diagnostics, and the register description, plus the operand-shape checks every
// rewrite starts with. Canonical nodes get the target-independent fixups here.

//! Reverse instruction selection driver.

use crate::core::{
    Diagnostic, DiagnosticKind, LiftError, LiftResult, LiftSession, RegisterInfo, Rewrite, Target,
};
use crate::dag::{NodeId, Opcode, SdValue, SelectionDag, ValueType};
use crate::ir::value::sign_extend_bits;

/// State handed to an inverse selector for each node.
pub struct SelectCx<'a, 'arena> {
    pub dag: &'a mut SelectionDag,
    pub session: &'a LiftSession<'arena>,
    pub reg_info: &'a dyn RegisterInfo,
}

impl<'a, 'arena> SelectCx<'a, 'arena> {
    pub fn new(
        dag: &'a mut SelectionDag,
        session: &'a LiftSession<'arena>,
        reg_info: &'a dyn RegisterInfo,
    ) -> Self {
        Self { dag, session, reg_info }
    }

    /// Operands of `id`, provided it has exactly the expected operand and result counts.
    pub fn expect_shape(
        &self,
        id: NodeId,
        name: &str,
        operands: usize,
        results: usize,
    ) -> LiftResult<Vec<SdValue>> {
        let node = self.dag.node(id);
        if node.operands.len() != operands || node.num_values() != results {
            return Err(LiftError::OperandShape {
                node: id,
                opcode: name.to_string(),
                expected: format!(
                    "{operands} operands and {results} results, found {} and {}",
                    node.operands.len(),
                    node.num_values()
                ),
            });
        }
        Ok(node.operands.clone())
    }

    /// Immediate operand, sign-extended from the width of its value type.
    pub fn immediate(&self, id: NodeId, name: &str, value: SdValue) -> LiftResult<i64> {
        let operand = self.dag.node(value.node);
        match (operand.opcode, operand.constant()) {
            (Opcode::Constant, Some(bits)) => {
                let width = operand.value_type(value.res).map(|vt| vt.bits()).unwrap_or(64);
                Ok(sign_extend_bits(bits, width))
            }
            _ => Err(LiftError::OperandShape {
                node: id,
                opcode: name.to_string(),
                expected: format!("a constant immediate, found {value}"),
            }),
        }
    }

    /// Unsigned immediate that must be below `limit`.
    pub fn bounded_immediate(&self, id: NodeId, name: &str, value: SdValue, limit: u32) -> LiftResult<u32> {
        let imm = self.immediate(id, name, value)?;
        if imm < 0 || imm >= limit as i64 {
            return Err(LiftError::OperandShape {
                node: id,
                opcode: name.to_string(),
                expected: format!("an immediate below {limit}, found {imm}"),
            });
        }
        Ok(imm as u32)
    }

    pub fn value_type(&self, value: SdValue) -> ValueType {
        self.dag.value_type(value).unwrap_or(ValueType::I64)
    }

    /// Redirect every use of result `res` of `id` to `with`.
    pub fn replace(&mut self, id: NodeId, res: u32, with: SdValue) {
        self.dag.replace_all_uses_of_value_with(SdValue::new(id, res), with);
    }

    pub fn report(&self, kind: DiagnosticKind, id: NodeId, message: impl Into<String>) {
        self.session.report(Diagnostic::new(kind, Some(id), message));
    }
}

/// Target-independent fixups on canonical nodes.
///
/// A `CopyFromReg` of the "no register" sentinel or of a register hard-wired to zero
/// becomes a zero constant of the copy's type, and its chain result is forwarded to its
/// chain operand.
pub fn fixup_canonical(cx: &mut SelectCx<'_, '_>, id: NodeId) -> LiftResult<Rewrite> {
    let node = cx.dag.node(id);
    if node.opcode != Opcode::CopyFromReg {
        return Ok(Rewrite::Unchanged);
    }
    let (Some(chain), Some(reg_op)) = (node.operand(0), node.operand(1)) else {
        return Ok(Rewrite::Unchanged);
    };
    let Some(reg) = cx.dag.node(reg_op.node).register() else {
        return Ok(Rewrite::Unchanged);
    };
    if !reg.is_none() && !cx.reg_info.is_zero_reg(reg) {
        return Ok(Rewrite::Unchanged);
    }

    let vt = node.value_type(0).unwrap_or(ValueType::I64);
    let zero = if vt.is_float() { cx.dag.get_constant_fp(0.0, vt) } else { cx.dag.get_constant(0, vt) };
    log::debug!("{id}: read of zero register replaced by a constant");
    cx.replace(id, 0, zero);
    cx.replace(id, 1, chain);
    Ok(Rewrite::Replaced)
}

/// Run the target's inverse selector over every live node of `dag`.
///
/// Returns the number of nodes replaced.
pub fn select_dag(dag: &mut SelectionDag, target: &dyn Target, session: &LiftSession<'_>) -> LiftResult<usize> {
    let mut selector = target.selector();
    let mut cx = SelectCx::new(dag, session, target.register_info());
    let mut rewritten = 0;

    for id in cx.dag.topological_order() {
        if cx.dag.node(id).dead {
            continue;
        }
        if selector.transmogrify(&mut cx, id)? == Rewrite::Replaced {
            log::debug!("{id}: {} rewritten", target.opcode_name(cx.dag.node(id).opcode));
            cx.dag.mark_dead(id);
            session.record_node_rewritten();
            rewritten += 1;
        }
    }

    Ok(rewritten)
}
