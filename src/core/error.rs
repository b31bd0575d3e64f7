// This module defines the error types of liftdag using the thiserror crate. LiftError covers
// the structural failures that abort the translation of one function: a constant node
// without a literal payload, a machine node whose operand list does not match what its
// rewrite expects, a graph deeper than the configured recursion limit, and references to
// nodes that do not exist. ParseError covers the textual operation-graph format and
// carries the offending line. Recoverable problems are not errors at all; they are
// reported as Diagnostics through the LiftSession and translation carries on.

//! Error types for liftdag.

use crate::dag::NodeId;
use thiserror::Error;

/// Structural errors that abort lifting of the current function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiftError {
    #[error("{node}: constant node has no well-formed literal payload")]
    MalformedConstant { node: NodeId },

    #[error("{node}: {opcode} expects {expected}")]
    OperandShape {
        node: NodeId,
        opcode: String,
        expected: String,
    },

    #[error("unknown machine opcode '{name}' for target {target}")]
    UnknownMachineOpcode { name: String, target: String },

    #[error("{node}: operation graph deeper than the limit of {limit}")]
    DepthLimit { node: NodeId, limit: usize },

    #[error("{node}: {reason}")]
    InvalidNode { node: NodeId, reason: String },
}

/// Result type alias for lifting operations.
pub type LiftResult<T> = Result<T, LiftError>;

/// Errors reading the textual operation-graph format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}
