// This module provides the per-run lifting session. LiftSession owns a reference to a
// bumpalo arena used to intern function names, the diagnostic stream, and statistics about
// the run. It is shared by reference between the selector and the emitter, so all state
// sits behind RefCell and every method takes &self. Diagnostics are the recoverable half
// of the error model: each one is logged through the log facade at warn level as it is
// reported and kept in order so the driver can print the whole stream at the end. The
// stats record functions lifted, nodes emitted per opcode, nodes rewritten by the
// selector and the largest function seen.

//! Arena-based lifting session.
//!
//! All per-run bookkeeping lives here so the selector and emitter can share it
//! by reference.

use crate::dag::NodeId;
use bumpalo::Bump;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// Category of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Opcode the emitter has no translation for.
    UnknownOpcode,
    /// An operand that should have produced a value did not.
    MissingOperand,
    /// Memory access without memory-operand metadata.
    MissingMemOperand,
    /// Register operand that does not resolve to a usable register.
    InvalidRegister,
    /// Register slot without a backing global at a return.
    MissingGlobal,
    /// Machine opcode with no inverse selection pattern.
    NoInversePattern,
}

impl DiagnosticKind {
    pub fn tag(self) -> &'static str {
        match self {
            DiagnosticKind::UnknownOpcode => "unknown-opcode",
            DiagnosticKind::MissingOperand => "missing-operand",
            DiagnosticKind::MissingMemOperand => "missing-memoperand",
            DiagnosticKind::InvalidRegister => "invalid-register",
            DiagnosticKind::MissingGlobal => "missing-global",
            DiagnosticKind::NoInversePattern => "no-inverse-pattern",
        }
    }
}

/// One advisory message from the lifter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub function: Option<String>,
    pub node: Option<NodeId>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, node: Option<NodeId>, message: impl Into<String>) -> Self {
        Self { kind, function: None, node, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning[{}]", self.kind.tag())?;
        if let Some(function) = &self.function {
            write!(f, " in {function}")?;
        }
        if let Some(node) = self.node {
            write!(f, " at {node}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Arena-based lifting session.
pub struct LiftSession<'arena> {
    /// Arena for interned strings.
    arena: &'arena Bump,

    stats: RefCell<SessionStats>,

    diagnostics: RefCell<Vec<Diagnostic>>,

    interned_strings: RefCell<HashMap<String, &'arena str>>,

    /// Function currently being lifted, attached to new diagnostics.
    current_function: RefCell<Option<&'arena str>>,
}

impl<'arena> LiftSession<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(SessionStats::default()),
            diagnostics: RefCell::new(Vec::new()),
            interned_strings: RefCell::new(HashMap::new()),
            current_function: RefCell::new(None),
        }
    }

    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Intern a string in the arena.
    pub fn intern_str(&self, s: &str) -> &'arena str {
        let mut strings = self.interned_strings.borrow_mut();
        if let Some(&interned) = strings.get(s) {
            return interned;
        }

        let interned = self.arena.alloc_str(s);
        strings.insert(s.to_string(), interned);
        interned
    }

    pub fn set_current_function(&self, name: &str) {
        let name = self.intern_str(name);
        *self.current_function.borrow_mut() = Some(name);
    }

    pub fn current_function(&self) -> Option<&'arena str> {
        *self.current_function.borrow()
    }

    pub fn clear_current_function(&self) {
        *self.current_function.borrow_mut() = None;
    }

    /// Record a recoverable problem and log it.
    pub fn report(&self, mut diagnostic: Diagnostic) {
        if diagnostic.function.is_none() {
            diagnostic.function = self.current_function().map(str::to_string);
        }
        log::warn!("{}", diagnostic);
        self.stats.borrow_mut().diagnostics += 1;
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.borrow().is_empty()
    }

    /// Record that a function was lifted.
    pub fn record_function_lifted(&self, name: &str, instructions: usize) {
        let mut stats = self.stats.borrow_mut();
        stats.functions_lifted += 1;
        stats.instructions_emitted += instructions;

        if stats.largest_function_size < instructions {
            stats.largest_function_size = instructions;
            stats.largest_function_name = name.to_string();
        }
    }

    /// Record a node translated by the emitter.
    pub fn record_node_emitted(&self, opcode: &str) {
        let mut stats = self.stats.borrow_mut();
        stats.nodes_emitted += 1;
        *stats.opcode_counts.entry(opcode.to_string()).or_insert(0) += 1;
    }

    /// Record a machine node replaced by the selector.
    pub fn record_node_rewritten(&self) {
        self.stats.borrow_mut().nodes_rewritten += 1;
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Lifting session statistics.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub functions_lifted: usize,

    /// IR instructions in all lifted functions.
    pub instructions_emitted: usize,

    pub nodes_emitted: usize,

    /// Count of emitted nodes per opcode name.
    pub opcode_counts: HashMap<String, usize>,

    pub nodes_rewritten: usize,

    pub diagnostics: usize,

    pub largest_function_size: usize,

    pub largest_function_name: String,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lifting Session Statistics:")?;
        writeln!(f, "  Functions lifted: {}", self.functions_lifted)?;
        writeln!(f, "  Nodes emitted: {}", self.nodes_emitted)?;
        writeln!(f, "  Nodes rewritten: {}", self.nodes_rewritten)?;
        writeln!(f, "  Instructions emitted: {}", self.instructions_emitted)?;
        writeln!(f, "  Diagnostics: {}", self.diagnostics)?;

        if !self.largest_function_name.is_empty() {
            writeln!(
                f,
                "  Largest function: {} ({} instructions)",
                self.largest_function_name, self.largest_function_size
            )?;
        }

        if !self.opcode_counts.is_empty() {
            writeln!(f, "  Opcode breakdown:")?;
            let mut sorted: Vec<_> = self.opcode_counts.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

            for (opcode, count) in sorted.into_iter().take(10) {
                writeln!(f, "    {}: {}", opcode, count)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lift_session_creation() {
        let arena = Bump::new();
        let session = LiftSession::new(&arena);

        let stats = session.stats();
        assert_eq!(stats.functions_lifted, 0);
        assert_eq!(stats.nodes_emitted, 0);
        assert!(!session.has_diagnostics());
    }

    #[test]
    fn test_string_interning() {
        let arena = Bump::new();
        let session = LiftSession::new(&arena);

        let s1 = session.intern_str("hello");
        let s2 = session.intern_str("hello");
        let s3 = session.intern_str("world");

        assert_eq!(s1.as_ptr(), s2.as_ptr());
        assert_ne!(s1.as_ptr(), s3.as_ptr());
    }

    #[test]
    fn test_diagnostics_carry_function() {
        let arena = Bump::new();
        let session = LiftSession::new(&arena);

        session.set_current_function("main");
        session.report(Diagnostic::new(DiagnosticKind::UnknownOpcode, Some(NodeId(5)), "no translation for FOO"));

        let diags = session.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].function.as_deref(), Some("main"));
        assert_eq!(
            diags[0].to_string(),
            "warning[unknown-opcode] in main at t5: no translation for FOO"
        );
        assert_eq!(session.stats().diagnostics, 1);
        assert_eq!(session.take_diagnostics().len(), 1);
        assert!(!session.has_diagnostics());
    }

    #[test]
    fn test_statistics_display() {
        let arena = Bump::new();
        let session = LiftSession::new(&arena);

        session.record_function_lifted("factorial", 12);
        session.record_node_emitted("add");
        session.record_node_emitted("CopyToReg");
        session.record_node_emitted("add");
        session.record_node_rewritten();

        let stats = session.stats();
        assert_eq!(stats.opcode_counts["add"], 2);

        let output = format!("{}", stats);
        assert!(output.contains("Functions lifted: 1"));
        assert!(output.contains("Nodes emitted: 3"));
        assert!(output.contains("Nodes rewritten: 1"));
        assert!(output.contains("factorial (12 instructions)"));
    }
}
