//! liftdag - instruction-semantics recovery from selection DAGs.
//!
//! liftdag takes the target-specific operation graph a decoder builds for each function
//! and recovers a target-independent IR from it. Lifting runs in two stages: a reverse
//! instruction selector rewrites composite machine encodings into canonical nodes, then
//! a memoizing emitter lowers the graph to IR, with architectural registers kept in
//! per-function stack slots backed by module globals.
//!
//! # Primary Usage
//!
//! ```ignore
//! use liftdag::{parse_dags, LiftOptions, LiftSession, Lifter, PowerPc64};
//! use bumpalo::Bump;
//!
//! let target = PowerPc64::new();
//! let mut dags = parse_dags(&text, &target)?;
//!
//! let arena = Bump::new();
//! let session = LiftSession::new(&arena);
//! let mut lifter = Lifter::new("module", &target, &session, LiftOptions::default());
//! lifter.lift_all(&mut dags)?;
//! println!("{}", lifter.module());
//! ```
//!
//! # Architecture
//!
//! - [`dag`] - operation graphs, their text format and printer
//! - [`ir`] - the output IR and its builder
//! - [`lift`] - inverse selection driver, emitter and register materialization
//! - [`target`] - target descriptions (PowerPC-64)
//! - [`core`] - errors, options, the lifting session and the target traits
//! - [`filecheck`] - FileCheck-style validation of `.dag` test files

pub mod core;
pub mod dag;
pub mod filecheck;
pub mod ir;
pub mod lift;
pub mod target;

pub use core::{
    Diagnostic, DiagnosticKind, InverseSelector, LiftError, LiftOptions, LiftResult, LiftSession,
    ParseError, RegisterInfo, Rewrite, SessionStats, Target,
};
pub use dag::{parse_dags, SelectionDag};
pub use ir::Module;
pub use lift::{DagEmitter, Lifter};
pub use target::{target_by_name, PowerPc64};
