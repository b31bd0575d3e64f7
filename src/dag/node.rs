// Operation nodes. A node is an opcode, an ordered operand list of (node, result) edges,
// one value type per result and an optional payload of literal data (constants,
// registers, condition codes, branch targets, shuffle masks). Memory-accessing nodes may
// carry a MemOperand describing width, extension and volatility, and any node may carry
// the address of the machine instruction it was decoded from. Rewritten nodes are marked
// dead rather than removed, so node ids stay stable for the lifetime of the graph.

//! Operation-graph nodes.

use super::opcode::{CondCode, Opcode};
use super::types::ValueType;
use crate::ir::{DebugLoc, Destination};
use std::fmt;

/// Index of a node in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// An operand edge: one result slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SdValue {
    pub node: NodeId,
    pub res: u32,
}

impl SdValue {
    pub fn new(node: NodeId, res: u32) -> Self {
        Self { node, res }
    }
}

impl From<NodeId> for SdValue {
    fn from(node: NodeId) -> Self {
        SdValue::new(node, 0)
    }
}

impl fmt::Display for SdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.res == 0 {
            write!(f, "{}", self.node)
        } else {
            write!(f, "{}:{}", self.node, self.res)
        }
    }
}

/// Abstract register index. Index 0 is the "no register" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(pub u32);

impl Reg {
    pub const NONE: Reg = Reg(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Literal data attached to a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    None,
    /// Integer constant as a raw bit pattern of the node's width.
    Constant(u64),
    ConstantFP(f64),
    Register(Reg),
    CondCode(CondCode),
    ValueType(ValueType),
    Target(Destination),
    ShuffleMask(Vec<i32>),
}

/// Extension applied to a narrow load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadExt {
    #[default]
    None,
    Sext,
    Zext,
}

/// Memory access metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemOperand {
    pub is_store: bool,
    /// Access width in bytes.
    pub size: u32,
    pub align: u32,
    pub ext: LoadExt,
    pub truncating: bool,
    pub volatile: bool,
}

impl MemOperand {
    /// Widest access the text format accepts, in bytes (a 512-bit vector).
    pub const MAX_SIZE: u32 = 64;

    pub fn load(size: u32) -> Self {
        Self {
            is_store: false,
            size,
            align: size.max(1),
            ext: LoadExt::None,
            truncating: false,
            volatile: false,
        }
    }

    pub fn store(size: u32) -> Self {
        Self { is_store: true, ..Self::load(size) }
    }

    pub fn bits(&self) -> u32 {
        self.size.saturating_mul(8)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub opcode: Opcode,
    pub operands: Vec<SdValue>,
    pub value_types: Vec<ValueType>,
    pub payload: Payload,
    pub mem: Option<MemOperand>,
    pub loc: Option<DebugLoc>,
    pub dead: bool,
}

impl Node {
    pub fn new(opcode: Opcode, value_types: Vec<ValueType>, operands: Vec<SdValue>) -> Self {
        Self {
            opcode,
            operands,
            value_types,
            payload: Payload::None,
            mem: None,
            loc: None,
            dead: false,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_mem(mut self, mem: MemOperand) -> Self {
        self.mem = Some(mem);
        self
    }

    pub fn with_loc(mut self, loc: Option<DebugLoc>) -> Self {
        self.loc = loc;
        self
    }

    pub fn num_values(&self) -> usize {
        self.value_types.len()
    }

    pub fn value_type(&self, res: u32) -> Option<ValueType> {
        self.value_types.get(res as usize).copied()
    }

    pub fn operand(&self, i: usize) -> Option<SdValue> {
        self.operands.get(i).copied()
    }

    /// Whether the node takes part in side-effect ordering.
    pub fn has_chain(&self) -> bool {
        self.value_types.iter().any(|vt| vt.is_chain())
    }

    pub fn constant(&self) -> Option<u64> {
        match self.payload {
            Payload::Constant(bits) => Some(bits),
            _ => None,
        }
    }

    pub fn register(&self) -> Option<Reg> {
        match self.payload {
            Payload::Register(reg) => Some(reg),
            _ => None,
        }
    }

    pub fn cond_code(&self) -> Option<CondCode> {
        match self.payload {
            Payload::CondCode(cc) => Some(cc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sd_value_display() {
        assert_eq!(SdValue::new(NodeId(3), 0).to_string(), "t3");
        assert_eq!(SdValue::new(NodeId(3), 1).to_string(), "t3:1");
    }

    #[test]
    fn test_node_accessors() {
        let node = Node::new(Opcode::Constant, vec![ValueType::I64], vec![])
            .with_payload(Payload::Constant(4));
        assert_eq!(node.constant(), Some(4));
        assert_eq!(node.register(), None);
        assert!(!node.has_chain());
        assert_eq!(node.value_type(1), None);
    }
}
