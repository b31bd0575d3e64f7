// Textual printer for the output IR. The syntax is LLVM-flavoured: globals as
// `@X3 = global i64 0`, functions as `define void @f() { ... }` with labelled blocks, and
// values referenced by their symbolic names. Unnamed results are numbered %0, %1, ... in
// layout order per function, the way LLVM's slot tracker does, so the numbering is
// computed in a pre-pass before any instruction is written.

//! IR printer.

use super::function::Function;
use super::instruction::{Destination, InstKind, Instruction};
use super::module::Module;
use super::types::Type;
use super::value::{sign_extend_bits, InstId, Value};
use hashbrown::HashMap;
use std::fmt::{self, Write};

/// Per-function printing context: slot numbers for unnamed values.
struct DisplayCtx<'a> {
    module: &'a Module,
    func: &'a Function,
    slots: HashMap<InstId, u32>,
}

impl<'a> DisplayCtx<'a> {
    fn new(module: &'a Module, func: &'a Function) -> Self {
        let mut slots = HashMap::new();
        let mut next = 0u32;
        for (id, inst) in func.insts() {
            if inst.has_result() && inst.name.is_empty() {
                slots.insert(id, next);
                next += 1;
            }
        }
        Self { module, func, slots }
    }

    fn value_ref(&self, value: Value) -> String {
        match value {
            Value::Inst(id) => {
                let inst = self.func.inst(id);
                if inst.name.is_empty() {
                    match self.slots.get(&id) {
                        Some(n) => format!("%{n}"),
                        None => "%<void>".to_string(),
                    }
                } else {
                    format!("%{}", inst.name)
                }
            }
            Value::Global(id) => format!("@{}", self.module.global_var(id).name),
            other => constant_text(other),
        }
    }

    fn typed(&self, value: Value) -> String {
        format!("{} {}", self.func.type_of(value), self.value_ref(value))
    }

    fn dest(&self, dest: Destination) -> String {
        match dest {
            Destination::Block(block) => format!("label %{}", self.func.block(block).name),
            other => format!("label %{}", other.label().unwrap_or_default()),
        }
    }

    fn write_inst(&self, out: &mut String, id: InstId, inst: &Instruction) -> fmt::Result {
        out.push_str("  ");
        if inst.has_result() {
            write!(out, "{} = ", self.value_ref(Value::Inst(id)))?;
        }
        match &inst.kind {
            InstKind::Alloca { allocated } => write!(out, "alloca {allocated}")?,
            InstKind::Load { ptr, volatile } => {
                let v = if *volatile { "volatile " } else { "" };
                write!(out, "load {v}{}, {}", inst.ty, self.typed(*ptr))?
            }
            InstKind::Store { value, ptr, volatile } => {
                let v = if *volatile { "volatile " } else { "" };
                write!(out, "store {v}{}, {}", self.typed(*value), self.typed(*ptr))?
            }
            InstKind::Binary { op, lhs, rhs } => write!(
                out,
                "{} {}, {}",
                op.mnemonic(),
                self.typed(*lhs),
                self.value_ref(*rhs)
            )?,
            InstKind::FNeg { operand } => write!(out, "fneg {}", self.typed(*operand))?,
            InstKind::Cast { op, value } => {
                write!(out, "{} {} to {}", op.mnemonic(), self.typed(*value), inst.ty)?
            }
            InstKind::ICmp { pred, lhs, rhs } => write!(
                out,
                "icmp {} {}, {}",
                pred.mnemonic(),
                self.typed(*lhs),
                self.value_ref(*rhs)
            )?,
            InstKind::FCmp { pred, lhs, rhs } => write!(
                out,
                "fcmp {} {}, {}",
                pred.mnemonic(),
                self.typed(*lhs),
                self.value_ref(*rhs)
            )?,
            InstKind::Select { cond, on_true, on_false } => write!(
                out,
                "select {}, {}, {}",
                self.typed(*cond),
                self.typed(*on_true),
                self.typed(*on_false)
            )?,
            InstKind::Call { intrinsic, args } => {
                let overload = args.first().map(|a| self.func.type_of(*a)).unwrap_or(inst.ty);
                let args: Vec<String> = args.iter().map(|a| self.typed(*a)).collect();
                write!(out, "call {} @{}({})", inst.ty, intrinsic.name(overload), args.join(", "))?
            }
            InstKind::ExtractElement { vector, index } => {
                write!(out, "extractelement {}, {}", self.typed(*vector), self.typed(*index))?
            }
            InstKind::InsertElement { vector, element, index } => write!(
                out,
                "insertelement {}, {}, {}",
                self.typed(*vector),
                self.typed(*element),
                self.typed(*index)
            )?,
            InstKind::ShuffleVector { lhs, rhs, mask } => {
                let lanes: Vec<String> = mask
                    .iter()
                    .map(|&m| if m < 0 { "i32 undef".to_string() } else { format!("i32 {m}") })
                    .collect();
                write!(
                    out,
                    "shufflevector {}, {}, <{} x i32> <{}>",
                    self.typed(*lhs),
                    self.typed(*rhs),
                    mask.len(),
                    lanes.join(", ")
                )?
            }
            InstKind::Br { dest } => write!(out, "br {}", self.dest(*dest))?,
            InstKind::CondBr { cond, on_true, on_false } => write!(
                out,
                "br {}, {}, {}",
                self.typed(*cond),
                self.dest(*on_true),
                self.dest(*on_false)
            )?,
            InstKind::Ret { value: Some(value) } => write!(out, "ret {}", self.typed(*value))?,
            InstKind::Ret { value: None } => out.push_str("ret void"),
        }
        out.push('\n');
        Ok(())
    }
}

fn constant_text(value: Value) -> String {
    match value {
        Value::ConstInt { ty: Type::I1, bits } => (if bits != 0 { "true" } else { "false" }).to_string(),
        Value::ConstInt { ty: Type::Ptr, bits: 0 } => "null".to_string(),
        Value::ConstInt { ty: Type::Vector { .. }, bits: 0 } => "zeroinitializer".to_string(),
        Value::ConstInt { ty, bits } => sign_extend_bits(bits, ty.bits()).to_string(),
        Value::ConstFloat { value, .. } => format!("{value:?}"),
        Value::Undef(_) => "undef".to_string(),
        Value::Inst(_) | Value::Global(_) => String::new(),
    }
}

/// Render one function in the context of its module.
pub fn function_to_string(module: &Module, func: &Function) -> String {
    let ctx = DisplayCtx::new(module, func);
    let mut out = String::new();
    out.push_str(&format!("define void @{}() {{\n", func.name));
    for (i, (_, block)) in func.blocks().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{}:\n", block.name));
        for &id in &block.insts {
            // Writing into a String cannot fail.
            let _ = ctx.write_inst(&mut out, id, func.inst(id));
        }
    }
    out.push_str("}\n");
    out
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        if !self.globals().is_empty() {
            writeln!(f)?;
        }
        for global in self.globals() {
            writeln!(f, "@{} = global {} {}", global.name, global.ty, constant_text(global.init))?;
        }
        for func in self.functions() {
            writeln!(f)?;
            f.write_str(&function_to_string(self, func))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::IrBuilder;
    use crate::ir::instruction::BinOp;

    #[test]
    fn test_print_function() {
        let mut module = Module::new("m");
        let cell = module.add_global("X3", Type::I64, Value::zero(Type::I64));
        let mut func = Function::new("f");
        let block = func.add_block("body");
        {
            let mut b = IrBuilder::at_end(&mut func, block);
            let v = b.load(Type::I64, Value::Global(cell), false, "X3");
            let sum = b.binary(BinOp::Add, v, Value::const_int(Type::I64, (-4i64) as u64), "");
            b.store(sum, Value::Global(cell), false);
            b.ret(None);
        }
        module.add_function(func);

        let text = module.to_string();
        assert!(text.contains("@X3 = global i64 0"));
        assert!(text.contains("  %X3 = load i64, ptr @X3\n"));
        assert!(text.contains("  %0 = add i64 %X3, -4\n"));
        assert!(text.contains("  store i64 %0, ptr @X3\n"));
        assert!(text.contains("  ret void\n"));
    }
}
