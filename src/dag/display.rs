// Printer for operation graphs in the same syntax the parser reads. Machine opcode and
// register names come from the target description, so printing needs one; node ids are
// arena indices and dead nodes are skipped. The driver uses this to dump graphs after
// the reverse selector has run.

//! Operation-graph printer.

use super::graph::SelectionDag;
use super::node::{LoadExt, Node, Payload};
use crate::core::Target;
use crate::ir::value::sign_extend_bits;
use crate::ir::Destination;
use std::fmt;

/// A graph paired with the target that names its machine opcodes.
pub struct DagDisplay<'a> {
    dag: &'a SelectionDag,
    target: &'a dyn Target,
}

impl SelectionDag {
    pub fn display<'a>(&'a self, target: &'a dyn Target) -> DagDisplay<'a> {
        DagDisplay { dag: self, target }
    }
}

impl DagDisplay<'_> {
    fn write_node(&self, f: &mut fmt::Formatter<'_>, node: &Node) -> fmt::Result {
        let types: Vec<String> = node.value_types.iter().map(|vt| vt.to_string()).collect();
        write!(f, "{} = {}", types.join(","), self.target.opcode_name(node.opcode))?;

        match &node.payload {
            Payload::None => {}
            Payload::Constant(bits) => {
                let width = node.value_types.first().map(|vt| vt.bits()).unwrap_or(64);
                write!(f, "<{}>", sign_extend_bits(*bits, width))?
            }
            Payload::ConstantFP(value) => write!(f, "<{value:?}>")?,
            Payload::Register(reg) if reg.is_none() => write!(f, " $noreg")?,
            Payload::Register(reg) => match self.target.register_info().reg_name(*reg) {
                Some(name) => write!(f, " %{name}")?,
                None => write!(f, " %r{}", reg.0)?,
            },
            Payload::CondCode(cc) => write!(f, "<{cc}>")?,
            Payload::ValueType(vt) => write!(f, "<{vt}>")?,
            Payload::Target(Destination::Address(addr)) => write!(f, "<{addr:#x}>")?,
            Payload::Target(Destination::Relative(disp)) => write!(f, "<{disp:+}>")?,
            Payload::Target(Destination::Block(block)) => write!(f, "<bb{}>", block.0)?,
            Payload::ShuffleMask(mask) => {
                let lanes: Vec<String> = mask
                    .iter()
                    .map(|&m| if m < 0 { "u".to_string() } else { m.to_string() })
                    .collect();
                write!(f, "<{}>", lanes.join(","))?
            }
        }

        let operands: Vec<String> = node.operands.iter().map(|op| op.to_string()).collect();
        if !operands.is_empty() {
            write!(f, " {}", operands.join(", "))?;
        }

        if let Some(mem) = &node.mem {
            let kind = if mem.is_store { "store" } else { "load" };
            write!(f, " ({kind} {}", mem.size)?;
            match mem.ext {
                LoadExt::None => {}
                LoadExt::Sext => write!(f, " sext")?,
                LoadExt::Zext => write!(f, " zext")?,
            }
            if mem.truncating {
                write!(f, " trunc")?;
            }
            if mem.volatile {
                write!(f, " volatile")?;
            }
            // Natural alignment is implied.
            if mem.align != mem.size.max(1) {
                write!(f, " align {}", mem.align)?;
            }
            write!(f, ")")?;
        }
        if let Some(loc) = node.loc {
            write!(f, " @{:#x}", loc.address)?;
        }
        Ok(())
    }
}

impl fmt::Display for DagDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function {} {{", self.dag.name())?;
        for id in self.dag.node_ids() {
            write!(f, "  {id}: ")?;
            self.write_node(f, self.dag.node(id))?;
            writeln!(f)?;
        }
        if let Some(root) = self.dag.root() {
            writeln!(f, "  root {root}")?;
        }
        writeln!(f, "}}")
    }
}
