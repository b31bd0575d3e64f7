// The DAG-to-IR emitter. Emission is demand driven: asking for the value of a node emits
// its operands first (depth-first, post-order), then the node itself, and records the
// resulting IR values in the visit cache so every node is translated at most once.
// Side-effecting nodes emit their chain operand before themselves, so whatever order
// nodes are requested in, memory and register effects come out in chain order. The
// operand walk runs on an explicit stack, not the call stack.
//
// Registers are read and written through per-function stack slots created by the
// register materializer in the entry block. Emitting a return flushes every slot back to
// its global and resets the translation context, so the next code path starts from a
// clean register map; side effects already emitted stay cached.
//
// Recoverable problems (unknown opcodes, operands that produced no value, unusable
// register operands) are reported as diagnostics and yield absent values; only a
// malformed constant or a graph deeper than the configured limit is an error.

//! Memoizing operation-graph to IR emitter.

use super::context::{NodeValues, TranslationContext};
use super::materializer::RegisterScope;
use crate::core::{
    Diagnostic, DiagnosticKind, LiftError, LiftOptions, LiftResult, LiftSession, RegisterInfo, Target,
};
use crate::dag::{LoadExt, MemOperand, Node, NodeId, Opcode, Payload, Reg, SdValue, SelectionDag, ValueType};
use crate::ir::{
    BinOp, BlockId, CastOp, DebugLoc, Destination, Function, InstId, IntPredicate, Intrinsic, IrBuilder,
    Module, Type, Value,
};
use std::ops::Range;

pub struct DagEmitter<'a, 'arena> {
    pub(super) dag: &'a SelectionDag,
    pub(super) target: &'a dyn Target,
    pub(super) reg_info: &'a dyn RegisterInfo,
    pub(super) module: &'a mut Module,
    pub(super) session: &'a LiftSession<'arena>,
    pub(super) options: LiftOptions,
    pub(super) func: Function,
    pub(super) cx: TranslationContext,
    entry: BlockId,
    block: BlockId,
    loc: Option<DebugLoc>,
}

impl<'a, 'arena> DagEmitter<'a, 'arena> {
    /// Start a function named after `dag`, with an `entry` block for register
    /// materialization that falls through to `body`.
    pub fn new(
        dag: &'a SelectionDag,
        target: &'a dyn Target,
        module: &'a mut Module,
        session: &'a LiftSession<'arena>,
        options: LiftOptions,
    ) -> Self {
        let reg_info = target.register_info();
        let mut func = Function::new(dag.name());
        let entry = func.add_block("entry");
        let body = func.add_block("body");
        IrBuilder::at_end(&mut func, entry).br(Destination::Block(body));

        Self {
            dag,
            target,
            reg_info,
            module,
            session,
            options,
            func,
            cx: TranslationContext::new(reg_info.num_regs()),
            entry,
            block: body,
            loc: None,
        }
    }

    pub fn function(&self) -> &Function {
        &self.func
    }

    pub fn module(&self) -> &Module {
        &*self.module
    }

    pub fn context(&self) -> &TranslationContext {
        &self.cx
    }

    pub fn finish(self) -> Function {
        self.func
    }

    /// Emit the first result of `id`.
    pub fn emit(&mut self, id: NodeId) -> LiftResult<Option<Value>> {
        self.emit_value(SdValue::new(id, 0))
    }

    /// Emit one result of a node, translating the node on first request.
    pub fn emit_value(&mut self, value: SdValue) -> LiftResult<Option<Value>> {
        if !self.cx.cache.contains(value.node) {
            self.emit_tree(value.node)?;
        }
        let values = self.cx.cache.get(value.node);
        Ok(values.and_then(|values| values.get(value.res as usize).copied().flatten()))
    }

    /// Emit `root` and everything it depends on that is not cached yet, operands before
    /// users and in operand order. The walk keeps its path on an explicit stack, so the
    /// visitors only ever find their operands already cached; the path length is what
    /// `max_depth` bounds.
    fn emit_tree(&mut self, root: NodeId) -> LiftResult<()> {
        let dag = self.dag;
        let limit = self.options.max_depth;
        // (node, next operand to descend into)
        let mut stack = vec![(root, 0usize)];
        while let Some(top) = stack.last_mut() {
            let (id, next) = *top;
            if !dag.contains(id) {
                return Err(LiftError::InvalidNode { node: id, reason: "node does not exist".to_string() });
            }
            if let Some(op) = dag.node(id).operands.get(next) {
                top.1 += 1;
                let child = op.node;
                if !self.cx.cache.contains(child) && !is_payload_leaf(dag, child) {
                    if stack.len() >= limit {
                        return Err(LiftError::DepthLimit { node: child, limit });
                    }
                    stack.push((child, 0));
                }
                continue;
            }
            stack.pop();
            if !self.cx.cache.contains(id) {
                let values = self.visit(id)?;
                self.cx.cache.insert(id, values);
            }
        }
        Ok(())
    }

    fn visit(&mut self, id: NodeId) -> LiftResult<NodeValues> {
        let dag = self.dag;
        let node = dag.node(id);
        log::trace!("emitting {id}: {}", self.target.opcode_name(node.opcode));

        let saved_loc = self.loc;
        if node.loc.is_some() {
            self.loc = node.loc;
        }
        let result = self.dispatch(id, node);
        self.loc = saved_loc;

        if result.is_ok() {
            self.session.record_node_emitted(&self.target.opcode_name(node.opcode));
        }
        result
    }

    fn dispatch(&mut self, id: NodeId, node: &'a Node) -> LiftResult<NodeValues> {
        match node.opcode {
            Opcode::EntryToken
            | Opcode::HandleNode
            | Opcode::Undef
            | Opcode::CondCode
            | Opcode::ValueType
            | Opcode::TargetAddress => Ok(absent(node)),
            Opcode::TokenFactor => {
                for &op in &node.operands {
                    self.emit_value(op)?;
                }
                Ok(absent(node))
            }
            Opcode::MergeValues => {
                let mut values = Vec::with_capacity(node.operands.len());
                for &op in &node.operands {
                    values.push(self.emit_value(op)?);
                }
                Ok(values)
            }

            Opcode::Register => self.visit_register(id, node),
            Opcode::CopyFromReg => self.visit_copy_from_reg(id, node),
            Opcode::CopyToReg => self.visit_copy_to_reg(id, node),
            Opcode::Constant => self.visit_constant(id, node),
            Opcode::ConstantFP => self.visit_constant_fp(id, node),

            Opcode::Add => self.visit_binary(id, node, BinOp::Add),
            Opcode::Sub => self.visit_binary(id, node, BinOp::Sub),
            Opcode::Mul => self.visit_binary(id, node, BinOp::Mul),
            Opcode::SDiv => self.visit_binary(id, node, BinOp::SDiv),
            Opcode::UDiv => self.visit_binary(id, node, BinOp::UDiv),
            Opcode::SRem => self.visit_binary(id, node, BinOp::SRem),
            Opcode::URem => self.visit_binary(id, node, BinOp::URem),
            Opcode::And => self.visit_binary(id, node, BinOp::And),
            Opcode::Or => self.visit_binary(id, node, BinOp::Or),
            Opcode::Xor => self.visit_binary(id, node, BinOp::Xor),
            Opcode::Shl => self.visit_binary(id, node, BinOp::Shl),
            Opcode::Sra => self.visit_binary(id, node, BinOp::AShr),
            Opcode::Srl => self.visit_binary(id, node, BinOp::LShr),
            Opcode::Rotl => self.visit_rotate(id, node, true),
            Opcode::Rotr => self.visit_rotate(id, node, false),
            Opcode::MulHU => self.visit_mul_high(id, node, false),
            Opcode::MulHS => self.visit_mul_high(id, node, true),
            Opcode::UMulLoHi => self.visit_mul_lohi(id, node, false),
            Opcode::SMulLoHi => self.visit_mul_lohi(id, node, true),
            Opcode::UDivRem => self.visit_divrem(id, node, false),
            Opcode::SDivRem => self.visit_divrem(id, node, true),
            Opcode::UMulO => self.visit_mul_overflow(id, node, false),
            Opcode::SMulO => self.visit_mul_overflow(id, node, true),
            Opcode::AddC => self.visit_carry(id, node, false, false),
            Opcode::SubC => self.visit_carry(id, node, true, false),
            Opcode::AddE => self.visit_carry(id, node, false, true),
            Opcode::SubE => self.visit_carry(id, node, true, true),
            Opcode::Ctlz => self.visit_count(id, node, Intrinsic::Ctlz, Some(false)),
            Opcode::CtlzZeroUndef => self.visit_count(id, node, Intrinsic::Ctlz, Some(true)),
            Opcode::Cttz => self.visit_count(id, node, Intrinsic::Cttz, Some(false)),
            Opcode::CttzZeroUndef => self.visit_count(id, node, Intrinsic::Cttz, Some(true)),
            Opcode::Ctpop => self.visit_count(id, node, Intrinsic::Ctpop, None),

            Opcode::Select | Opcode::VSelect => self.visit_select(id, node),
            Opcode::SelectCC => self.visit_select_cc(id, node),
            Opcode::SetCC => self.visit_setcc(id, node),

            Opcode::SignExtend => self.visit_cast(id, node, CastOp::SExt),
            Opcode::ZeroExtend | Opcode::AnyExtend => self.visit_cast(id, node, CastOp::ZExt),
            Opcode::Truncate => self.visit_cast(id, node, CastOp::Trunc),
            Opcode::Bitcast => self.visit_cast(id, node, CastOp::Bitcast),
            Opcode::FpRound => self.visit_cast(id, node, CastOp::FpTrunc),
            Opcode::FpExtend => self.visit_cast(id, node, CastOp::FpExt),
            Opcode::SintToFp => self.visit_cast(id, node, CastOp::SiToFp),
            Opcode::UintToFp => self.visit_cast(id, node, CastOp::UiToFp),
            Opcode::FpToSint => self.visit_cast(id, node, CastOp::FpToSi),
            Opcode::FpToUint => self.visit_cast(id, node, CastOp::FpToUi),
            Opcode::SignExtendInReg => self.visit_sext_inreg(id, node),
            Opcode::FpRoundInReg => self.visit_fp_round_inreg(id, node),
            Opcode::BuildPair => self.visit_build_pair(id, node),

            Opcode::FAdd => self.visit_binary(id, node, BinOp::FAdd),
            Opcode::FSub => self.visit_binary(id, node, BinOp::FSub),
            Opcode::FMul => self.visit_binary(id, node, BinOp::FMul),
            Opcode::FDiv => self.visit_binary(id, node, BinOp::FDiv),
            Opcode::FRem => self.visit_binary(id, node, BinOp::FRem),
            Opcode::FNeg => self.visit_fneg(id, node),
            Opcode::FMA => self.visit_float_intrinsic(id, node, Intrinsic::Fma, 3),
            Opcode::FCopySign => self.visit_copysign(id, node),
            Opcode::FAbs => self.visit_float_intrinsic(id, node, Intrinsic::Fabs, 1),
            Opcode::FFloor => self.visit_float_intrinsic(id, node, Intrinsic::Floor, 1),
            Opcode::FCeil => self.visit_float_intrinsic(id, node, Intrinsic::Ceil, 1),
            Opcode::FTrunc => self.visit_float_intrinsic(id, node, Intrinsic::Trunc, 1),

            Opcode::Load => self.visit_load(id, node),
            Opcode::Store => self.visit_store(id, node),

            Opcode::Br => self.visit_br(id, node),
            Opcode::BrCond => self.visit_brcond(id, node),
            Opcode::BrCC => self.visit_br_cc(id, node),
            Opcode::Ret => self.visit_ret(id, node),

            Opcode::InsertVectorElt => self.visit_insert_element(id, node),
            Opcode::ExtractVectorElt => self.visit_extract_element(id, node),
            Opcode::BuildVector => self.visit_build_vector(id, node),
            Opcode::ConcatVectors => self.visit_concat_vectors(id, node),
            Opcode::ExtractSubvector => self.visit_extract_subvector(id, node),
            Opcode::VectorShuffle => self.visit_vector_shuffle(id, node),

            Opcode::Machine(_) => {
                self.report(
                    DiagnosticKind::UnknownOpcode,
                    id,
                    format!("no translation for machine opcode {}", self.target.opcode_name(node.opcode)),
                );
                Ok(absent(node))
            }
        }
    }

    // Shared helpers used by every visitor.

    pub(super) fn report(&self, kind: DiagnosticKind, id: NodeId, message: impl Into<String>) {
        self.session.report(Diagnostic::new(kind, Some(id), message));
    }

    /// Builder appending to the current block, opening a new block after a terminator.
    pub(super) fn builder(&mut self) -> IrBuilder<'_> {
        if self.func.is_terminated(self.block) {
            self.open_block();
        }
        IrBuilder::at_end(&mut self.func, self.block).with_loc(self.loc)
    }

    fn open_block(&mut self) {
        let name = format!("bb{}", self.func.num_blocks() - 1);
        self.block = self.func.add_block(name);
    }

    /// Unique name derived from `base`; empty bases stay unnamed.
    pub(super) fn fresh(&mut self, base: &str) -> String {
        self.cx.names.indexed_name(self.func.symbols_mut(), base)
    }

    /// Base name for the result of `id`: the register of a `CopyToReg` consuming it,
    /// otherwise the base name of the first named operand.
    pub(super) fn base_for(&self, id: NodeId, operands: &[Value]) -> String {
        if let Some(reg) = self.copy_to_reg_name(id) {
            return reg;
        }
        for &op in operands {
            if let Some(name) = self.func.value_name(op) {
                let base = self.cx.names.base_name(name);
                if !base.is_empty() {
                    return base.to_string();
                }
            }
        }
        String::new()
    }

    fn copy_to_reg_name(&self, id: NodeId) -> Option<String> {
        for (user, index) in self.dag.users_of_value(SdValue::new(id, 0)) {
            let user = self.dag.node(user);
            if user.opcode != Opcode::CopyToReg || index != 2 {
                continue;
            }
            let reg = user.operand(1).and_then(|op| self.dag.node(op.node).register());
            if let Some(name) = reg.and_then(|reg| self.reg_info.reg_name(reg)) {
                return Some(name.to_string());
            }
        }
        None
    }

    /// Emit the chain operand of a side-effecting node.
    pub(super) fn emit_chain(&mut self, node: &Node) -> LiftResult<()> {
        if let Some(chain) = node.operand(0) {
            if self.dag.value_type(chain).is_some_and(|vt| vt.is_chain()) {
                self.emit_value(chain)?;
            }
        }
        Ok(())
    }

    /// Emit operand `index`, reporting it if it produces no value.
    pub(super) fn operand(&mut self, id: NodeId, node: &Node, index: usize) -> LiftResult<Option<Value>> {
        let Some(op) = node.operand(index) else {
            self.report(DiagnosticKind::MissingOperand, id, format!("operand {index} is missing"));
            return Ok(None);
        };
        let value = self.emit_value(op)?;
        if value.is_none() {
            self.report(
                DiagnosticKind::MissingOperand,
                id,
                format!("operand {index} ({op}) produced no value"),
            );
        }
        Ok(value)
    }

    /// Emit a range of operands; `None` if any of them is absent.
    pub(super) fn operands(&mut self, id: NodeId, node: &Node, range: Range<usize>) -> LiftResult<Option<Vec<Value>>> {
        let mut values = Vec::with_capacity(range.len());
        let mut complete = true;
        for index in range {
            match self.operand(id, node, index)? {
                Some(value) => values.push(value),
                None => complete = false,
            }
        }
        Ok(complete.then_some(values))
    }

    /// IR type of result `res`, reported when the node has no data result there.
    pub(super) fn result_type(&self, id: NodeId, node: &Node, res: u32) -> Option<Type> {
        let ty = node.value_type(res).and_then(|vt| vt.to_ir());
        if ty.is_none() {
            self.report(DiagnosticKind::MissingOperand, id, format!("result {res} has no data type"));
        }
        ty
    }

    /// Convert between integer widths and pointers; other mismatches are bitcast.
    pub(super) fn coerce(&mut self, value: Value, to: Type, base: &str) -> Value {
        let from = self.func.type_of(value);
        if from == to {
            return value;
        }
        if let (Value::ConstInt { bits, .. }, Type::Int(_)) = (value, to) {
            return Value::const_int(to, bits);
        }
        let op = match (from, to) {
            (Type::Int(a), Type::Int(b)) if a > b => CastOp::Trunc,
            (Type::Int(_), Type::Int(_)) => CastOp::ZExt,
            (Type::Ptr, Type::Int(_)) => CastOp::PtrToInt,
            (Type::Int(_), Type::Ptr) => CastOp::IntToPtr,
            _ if from.bits() == to.bits() => CastOp::Bitcast,
            _ => return value,
        };
        let name = self.fresh(base);
        self.builder().cast(op, value, to, &name)
    }

    /// Reduce a value to an `i1` truth value.
    pub(super) fn to_bool(&mut self, value: Value, base: &str) -> Value {
        let ty = self.func.type_of(value);
        if ty.element() == Type::I1 {
            return value;
        }
        let name = self.fresh(base);
        self.builder().icmp(IntPredicate::Ne, value, Value::zero(ty), &name)
    }

    fn to_pointer(&mut self, addr: Value, base: &str) -> Value {
        if self.func.type_of(addr).is_pointer() {
            addr
        } else {
            self.coerce(addr, Type::Ptr, base)
        }
    }

    pub(super) fn values(&self, node: &Node, first: &[Option<Value>]) -> NodeValues {
        let mut values = absent(node);
        for (slot, value) in values.iter_mut().zip(first) {
            *slot = *value;
        }
        values
    }

    // Registers and literals.

    fn register_slot(&mut self, id: NodeId, reg_operand: Option<SdValue>) -> Option<(InstId, Reg)> {
        let Some(reg) = reg_operand.and_then(|op| self.dag.node(op.node).register()) else {
            self.report(DiagnosticKind::InvalidRegister, id, "register operand is not a Register node");
            return None;
        };
        let scope = RegisterScope {
            reg_info: self.reg_info,
            module: &mut *self.module,
            func: &mut self.func,
            names: &mut self.cx.names,
        };
        match self.cx.regs.materialize(reg, scope, self.entry) {
            Ok(slot) => Some((slot, reg)),
            Err(err) => {
                self.report(DiagnosticKind::InvalidRegister, id, err.to_string());
                None
            }
        }
    }

    /// Load the current contents of a register's slot as a value of `node`'s first type.
    fn read_register(&mut self, id: NodeId, node: &Node, reg_operand: Option<SdValue>) -> Option<Value> {
        let (slot, reg) = self.register_slot(id, reg_operand)?;
        let slot_ty = self.func.allocated_type(slot).unwrap_or(Type::I64);
        let base = self.reg_info.reg_name(reg).unwrap_or_default().to_string();
        let name = self.fresh(&base);
        let value = self.builder().load(slot_ty, Value::Inst(slot), false, &name);
        match node.value_type(0).and_then(|vt| vt.to_ir()) {
            Some(ty) => Some(self.coerce(value, ty, &base)),
            None => Some(value),
        }
    }

    fn visit_copy_from_reg(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        self.emit_chain(node)?;
        if !self.dag.has_any_use_of_value(SdValue::new(id, 0)) {
            return Ok(absent(node));
        }
        let value = self.read_register(id, node, node.operand(1));
        Ok(self.values(node, &[value]))
    }

    /// A register used directly as a data operand reads its slot.
    fn visit_register(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let value = self.read_register(id, node, Some(SdValue::new(id, 0)));
        Ok(self.values(node, &[value]))
    }

    fn visit_copy_to_reg(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        self.emit_chain(node)?;
        let value = self.operand(id, node, 2)?;
        let slot = self.register_slot(id, node.operand(1));
        let (Some(value), Some((slot, reg))) = (value, slot) else {
            return Ok(absent(node));
        };

        let slot_ty = self.func.allocated_type(slot).unwrap_or(Type::I64);
        let base = self.reg_info.reg_name(reg).unwrap_or_default().to_string();
        let value = self.coerce(value, slot_ty, &base);
        let store = self.builder().store(value, Value::Inst(slot), false);
        Ok(self.values(node, &[Some(Value::Inst(store))]))
    }

    fn visit_constant(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let ty = node.value_type(0).and_then(|vt| vt.to_ir());
        match (&node.payload, ty) {
            (Payload::Constant(bits), Some(ty @ Type::Int(_))) => {
                Ok(self.values(node, &[Some(Value::const_int(ty, *bits))]))
            }
            _ => Err(LiftError::MalformedConstant { node: id }),
        }
    }

    fn visit_constant_fp(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        let ty = node.value_type(0).and_then(|vt| vt.to_ir());
        match (&node.payload, ty) {
            (Payload::ConstantFP(value), Some(ty)) if ty.is_float() => {
                Ok(self.values(node, &[Some(Value::ConstFloat { ty, value: *value })]))
            }
            _ => Err(LiftError::MalformedConstant { node: id }),
        }
    }

    // Memory.

    fn mem_operand(&self, id: NodeId, node: &Node, fallback: MemOperand) -> MemOperand {
        match node.mem {
            Some(mem) if mem.size > 0 => mem,
            Some(_) => {
                self.report(
                    DiagnosticKind::MissingMemOperand,
                    id,
                    format!("zero-width memory operand, assuming {} bytes", fallback.size),
                );
                fallback
            }
            None => {
                self.report(
                    DiagnosticKind::MissingMemOperand,
                    id,
                    format!("memory access without memory operand, assuming {} bytes", fallback.size),
                );
                fallback
            }
        }
    }

    fn visit_load(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        self.emit_chain(node)?;
        let Some(addr) = self.operand(id, node, 1)? else {
            return Ok(absent(node));
        };
        let Some(result_ty) = self.result_type(id, node, 0) else {
            return Ok(absent(node));
        };
        let mem = self.mem_operand(id, node, MemOperand::load(result_ty.bits().div_ceil(8)));

        let base = self.base_for(id, &[addr]);
        let ptr = self.to_pointer(addr, &base);
        let narrow = result_ty.is_integer() && mem.bits() < result_ty.bits();
        let mem_ty = if narrow { Type::Int(mem.bits() as u16) } else { result_ty };
        let name = self.fresh(&base);
        let mut value = self.builder().load(mem_ty, ptr, mem.volatile, &name);
        if narrow {
            let op = if mem.ext == LoadExt::Sext { CastOp::SExt } else { CastOp::ZExt };
            let name = self.fresh(&base);
            value = self.builder().cast(op, value, result_ty, &name);
        }
        Ok(self.values(node, &[Some(value)]))
    }

    fn visit_store(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        self.emit_chain(node)?;
        let value = self.operand(id, node, 1)?;
        let addr = self.operand(id, node, 2)?;
        let (Some(mut value), Some(addr)) = (value, addr) else {
            return Ok(absent(node));
        };

        let value_ty = self.func.type_of(value);
        let mem = self.mem_operand(id, node, MemOperand::store(value_ty.bits().div_ceil(8)));
        let addr_base = self.base_for(id, &[addr]);
        let ptr = self.to_pointer(addr, &addr_base);
        if value_ty.is_integer() && mem.bits() < value_ty.bits() {
            let base = self.base_for(id, &[value]);
            let name = self.fresh(&base);
            value = self.builder().cast(CastOp::Trunc, value, Type::Int(mem.bits() as u16), &name);
        }
        let store = self.builder().store(value, ptr, mem.volatile);
        Ok(self.values(node, &[Some(Value::Inst(store))]))
    }

    // Control flow.

    fn destination(&self, id: NodeId, node: &Node, index: usize) -> Option<Destination> {
        let dest = node.operand(index).and_then(|op| match self.dag.node(op.node).payload {
            Payload::Target(dest) => Some(dest),
            _ => None,
        });
        if dest.is_none() {
            self.report(DiagnosticKind::MissingOperand, id, format!("operand {index} is not a branch target"));
        }
        dest
    }

    fn visit_br(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        self.emit_chain(node)?;
        let Some(dest) = self.destination(id, node, 1) else {
            return Ok(absent(node));
        };
        let br = self.builder().br(dest);
        Ok(self.values(node, &[Some(Value::Inst(br))]))
    }

    /// Branch to `dest` when `cond` holds, falling through to a fresh block.
    fn conditional_branch(&mut self, node: &Node, cond: Value, dest: Destination) -> NodeValues {
        if self.func.is_terminated(self.block) {
            self.open_block();
        }
        let fallthrough = BlockId(self.func.num_blocks() as u32);
        let br = IrBuilder::at_end(&mut self.func, self.block)
            .with_loc(self.loc)
            .cond_br(cond, dest, Destination::Block(fallthrough));
        self.open_block();
        self.values(node, &[Some(Value::Inst(br))])
    }

    fn visit_brcond(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        self.emit_chain(node)?;
        let cond = self.operand(id, node, 1)?;
        let dest = self.destination(id, node, 2);
        let (Some(cond), Some(dest)) = (cond, dest) else {
            return Ok(absent(node));
        };
        let base = self.base_for(id, &[cond]);
        let cond = self.to_bool(cond, &base);
        Ok(self.conditional_branch(node, cond, dest))
    }

    fn visit_br_cc(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        self.emit_chain(node)?;
        let cc = node.operand(1).and_then(|op| self.dag.node(op.node).cond_code());
        let operands = self.operands(id, node, 2..4)?;
        let dest = self.destination(id, node, 4);
        let (Some(cc), Some(operands), Some(dest)) = (cc, operands, dest) else {
            if cc.is_none() {
                self.report(DiagnosticKind::MissingOperand, id, "operand 1 is not a condition code");
            }
            return Ok(absent(node));
        };
        let base = self.base_for(id, &operands);
        let cond = self.compare(cc, operands[0], operands[1], &base);
        Ok(self.conditional_branch(node, cond, dest))
    }

    fn visit_ret(&mut self, id: NodeId, node: &Node) -> LiftResult<NodeValues> {
        self.emit_chain(node)?;
        let mut value = None;
        for (index, op) in node.operands.iter().enumerate().skip(1) {
            if self.dag.value_type(*op).is_some_and(is_data) {
                value = self.operand(id, node, index)?;
                break;
            }
        }

        let mut b = self.builder();
        let block = b.block();
        let ret = b.ret(value);

        let scope = RegisterScope {
            reg_info: self.reg_info,
            module: &mut *self.module,
            func: &mut self.func,
            names: &mut self.cx.names,
        };
        self.cx.regs.flush(scope, block, self.loc, self.session);
        let dag = self.dag;
        self.cx.reset_after_return(|n| dag.node(n).has_chain());
        log::debug!("{}: return at {id}, register state flushed", self.func.name);
        Ok(self.values(node, &[Some(Value::Inst(ret))]))
    }
}

/// Nodes whose consumers read their payload instead of emitting them; they are only
/// visited when requested as a value.
fn is_payload_leaf(dag: &SelectionDag, id: NodeId) -> bool {
    dag.contains(id)
        && matches!(
            dag.node(id).opcode,
            Opcode::Register | Opcode::CondCode | Opcode::ValueType | Opcode::TargetAddress
        )
}

/// No values for any result of `node`.
pub(super) fn absent(node: &Node) -> NodeValues {
    vec![None; node.num_values().max(1)]
}

/// Whether `vt` is carried as an IR value.
pub(super) fn is_data(vt: ValueType) -> bool {
    vt.to_ir().is_some()
}
