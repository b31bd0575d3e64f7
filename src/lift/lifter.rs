// The per-function pipeline. Lifter owns the IR module being built and runs each
// decoded operation graph through two stages: the target's reverse instruction selector
// rewrites machine nodes into canonical ones in place, then the emitter walks the
// side-effecting nodes in topological order and lowers everything reachable from them.
// A fatal error aborts the current function before it is added to the module; earlier
// functions stay lifted.

//! Function lifting driver.

use super::emitter::DagEmitter;
use super::select::select_dag;
use crate::core::{LiftOptions, LiftResult, LiftSession, Target};
use crate::dag::SelectionDag;
use crate::ir::Module;

pub struct Lifter<'a, 'arena> {
    target: &'a dyn Target,
    session: &'a LiftSession<'arena>,
    options: LiftOptions,
    module: Module,
}

impl<'a, 'arena> Lifter<'a, 'arena> {
    pub fn new(
        module_name: &str,
        target: &'a dyn Target,
        session: &'a LiftSession<'arena>,
        options: LiftOptions,
    ) -> Self {
        Self { target, session, options, module: Module::new(module_name) }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn into_module(self) -> Module {
        self.module
    }

    /// Lift one function graph into the module.
    pub fn lift_function(&mut self, dag: &mut SelectionDag) -> LiftResult<()> {
        self.session.set_current_function(dag.name());
        let result = self.lift_inner(dag);
        self.session.clear_current_function();
        result
    }

    /// Lift graphs in order, stopping at the first fatal error.
    pub fn lift_all(&mut self, dags: &mut [SelectionDag]) -> LiftResult<()> {
        for dag in dags {
            self.lift_function(dag)?;
        }
        Ok(())
    }

    fn lift_inner(&mut self, dag: &mut SelectionDag) -> LiftResult<()> {
        if self.options.run_selector {
            let rewritten = select_dag(dag, self.target, self.session)?;
            log::debug!("{}: {rewritten} nodes rewritten", dag.name());
        }

        let dag: &SelectionDag = dag;
        let order = dag.emission_order();
        let mut emitter = DagEmitter::new(dag, self.target, &mut self.module, self.session, self.options);
        for id in order {
            emitter.emit(id)?;
        }
        let func = emitter.finish();

        log::info!("lifted {} ({} instructions, {} blocks)", func.name, func.num_insts(), func.num_blocks());
        self.session.record_function_lifted(&func.name, func.num_insts());
        self.module.add_function(func);
        Ok(())
    }
}
