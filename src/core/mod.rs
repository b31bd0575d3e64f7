// This module gathers the infrastructure shared by every part of liftdag: the error
// types, the lifting session with its diagnostic stream and statistics, the options of a
// lifting run, and the traits a target description implements. Nothing here knows about
// a particular architecture or about how nodes are translated; the graph, IR and lifter
// modules build on these pieces.

//! Core liftdag infrastructure.
//!
//! # Key Components
//!
//! ## Session Management (`session`)
//! - Arena-backed string interning using `bumpalo`
//! - Diagnostic collection and lifting statistics
//!
//! ## Errors (`error`)
//! - Structural lifting errors and text-format parse errors
//!
//! ## Target Seams (`target`)
//! - Register descriptions, machine opcode tables and inverse selectors

pub mod error;
pub mod options;
pub mod session;
pub mod target;

pub use error::{LiftError, LiftResult, ParseError};
pub use options::LiftOptions;
pub use session::{Diagnostic, DiagnosticKind, LiftSession, SessionStats};
pub use target::{InverseSelector, RegisterInfo, Rewrite, Target};
