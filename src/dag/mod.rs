// This module is the input side of the lifter: the operation graph (selection DAG) that a
// decoder produces for one function. It holds the node arena with its multi-result edges,
// the closed canonical opcode vocabulary, value types including the chain token, and a
// line-oriented text format with parser and printer so graphs can be written by hand for
// tests and dumped by the driver.

//! Operation graphs.

pub mod display;
pub mod graph;
pub mod node;
pub mod opcode;
pub mod parser;
pub mod types;

pub use display::DagDisplay;
pub use graph::SelectionDag;
pub use node::{LoadExt, MemOperand, Node, NodeId, Payload, Reg, SdValue};
pub use opcode::{CondCode, Opcode};
pub use parser::parse_dags;
pub use types::ValueType;
