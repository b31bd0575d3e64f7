//! FileCheck-style test validation for operation-graph files.
//!
//! A `.dag` test file holds one or more functions in the graph text format plus
//! comment directives: `; RUN:` lines choose what the run prints and `; CHECK:` lines
//! (with the `-NEXT`, `-LABEL` and `-EMPTY` variants) are matched against that output,
//! similar to LLVM's FileCheck tool but implemented in a Rust-native way.

use crate::core::{LiftOptions, LiftSession, Target};
use crate::dag::parse_dags;
use crate::lift::Lifter;
use bumpalo::Bump;
use std::fmt::Write;

/// A CHECK directive extracted from a test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckDirective {
    /// CHECK: pattern - Match on this or any later line
    Check(String),
    /// CHECK-LABEL: pattern - Label for a section
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Match on the next line
    CheckNext(String),
    /// CHECK-EMPTY - Match empty line
    CheckEmpty,
    /// COM: comment - Comment, ignored
    Comment(String),
}

/// What a RUN line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirective {
    pub run_selector: bool,
    pub print_dag: bool,
    pub print_diagnostics: bool,
    /// `not` prefix: the run must stop with a fatal error.
    pub expect_failure: bool,
}

impl RunDirective {
    fn parse(line: &str) -> Self {
        let (expect_failure, line) = match line.trim().strip_prefix("not ") {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let mut run = RunDirective {
            run_selector: true,
            print_dag: false,
            print_diagnostics: false,
            expect_failure,
        };
        for arg in line.split_whitespace() {
            match arg {
                "--no-select" => run.run_selector = false,
                "--print-dag" => run.print_dag = true,
                "--print-diagnostics" => run.print_diagnostics = true,
                _ => {}
            }
        }
        run
    }
}

/// Test specification extracted from a test file
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub dag_content: String,
}

impl TestSpec {
    /// Split a test file into directives and graph text
    pub fn parse(content: &str) -> Self {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut dag_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run) = trimmed.strip_prefix("; RUN:") {
                run_directives.push(RunDirective::parse(run));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-LABEL:") {
                check_directives.push(CheckDirective::CheckLabel(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NEXT:") {
                check_directives.push(CheckDirective::CheckNext(pattern.trim().to_string()));
            } else if trimmed.starts_with("; CHECK-EMPTY") {
                check_directives.push(CheckDirective::CheckEmpty);
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK:") {
                check_directives.push(CheckDirective::Check(pattern.trim().to_string()));
            } else if let Some(comment) = trimmed.strip_prefix("; COM:") {
                check_directives.push(CheckDirective::Comment(comment.trim().to_string()));
            } else {
                dag_lines.push(line);
            }
        }

        TestSpec { run_directives, check_directives, dag_content: dag_lines.join("\n") }
    }
}

/// Test runner that lifts graph files and validates the output
pub struct TestRunner<'t> {
    target: &'t dyn Target,
    verbose: bool,
}

impl<'t> TestRunner<'t> {
    pub fn new(target: &'t dyn Target, verbose: bool) -> Self {
        Self { target, verbose }
    }

    /// Run every RUN line of a test and validate each output
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), String> {
        if spec.run_directives.is_empty() {
            return Err("no RUN directive".to_string());
        }
        for run in &spec.run_directives {
            let output = self.execute(&spec.dag_content, run)?;
            if self.verbose {
                println!("{output}");
            }
            self.validate_output(&output, &spec.check_directives)?;
        }
        Ok(())
    }

    /// Lift the graph text and render what the RUN line asks for
    pub fn execute(&self, dag_text: &str, run: &RunDirective) -> Result<String, String> {
        let mut dags = parse_dags(dag_text, self.target).map_err(|e| format!("parse error: {e}"))?;
        let arena = Bump::new();
        let session = LiftSession::new(&arena);
        let options = LiftOptions { run_selector: run.run_selector, ..LiftOptions::default() };
        let mut lifter = Lifter::new("filecheck", self.target, &session, options);

        let mut output = String::new();
        let mut failure = None;
        for dag in dags.iter_mut() {
            let result = lifter.lift_function(dag);
            if run.print_dag {
                let _ = write!(output, "{}", dag.display(self.target));
            }
            if let Err(err) = result {
                failure = Some(err);
                break;
            }
        }

        match (failure, run.expect_failure) {
            (Some(err), true) => {
                let _ = writeln!(output, "error: {err}");
            }
            (Some(err), false) => return Err(format!("lifting failed: {err}")),
            (None, true) => return Err("expected lifting to fail".to_string()),
            (None, false) => {
                let _ = write!(output, "{}", lifter.module());
            }
        }

        if run.print_diagnostics {
            for diagnostic in session.diagnostics() {
                let _ = writeln!(output, "{diagnostic}");
            }
        }
        Ok(output)
    }

    /// Validate output against CHECK directives
    pub fn validate_output(&self, output: &str, directives: &[CheckDirective]) -> Result<(), String> {
        let output_lines: Vec<&str> = output.lines().collect();
        let mut line_idx = 0;

        for directive in directives {
            match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::Check(pattern) | CheckDirective::CheckLabel(pattern) => {
                    let kind = if matches!(directive, CheckDirective::Check(_)) { "CHECK" } else { "CHECK-LABEL" };
                    let found = output_lines.iter().skip(line_idx).position(|line| line.contains(pattern.as_str()));
                    match found {
                        Some(idx) => {
                            line_idx += idx + 1;
                            if self.verbose {
                                println!("{kind}: '{pattern}' found at line {}", line_idx - 1);
                            }
                        }
                        None => return Err(format!("{kind}: pattern '{pattern}' not found in output")),
                    }
                }

                CheckDirective::CheckNext(pattern) => {
                    let Some(line) = output_lines.get(line_idx) else {
                        return Err(format!("CHECK-NEXT: no more lines, expected '{pattern}'"));
                    };
                    if !line.contains(pattern.as_str()) {
                        return Err(format!("CHECK-NEXT: expected '{pattern}' but got '{line}'"));
                    }
                    line_idx += 1;
                }

                CheckDirective::CheckEmpty => {
                    // End of output counts as empty
                    if let Some(line) = output_lines.get(line_idx) {
                        if !line.trim().is_empty() {
                            return Err(format!("CHECK-EMPTY: expected empty line but got '{line}'"));
                        }
                        line_idx += 1;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::PowerPc64;

    #[test]
    fn test_parse_directives() {
        let content = "; RUN: liftdag --print-dag %s
; CHECK-LABEL: define void @f()
; CHECK-NEXT: entry:
; COM: This is a comment
function f {
  t0: ch = EntryToken
}";
        let spec = TestSpec::parse(content);
        assert_eq!(spec.run_directives.len(), 1);
        assert!(spec.run_directives[0].print_dag);
        assert!(spec.run_directives[0].run_selector);
        assert_eq!(spec.check_directives.len(), 3);
        assert!(spec.dag_content.contains("function f {"));
    }

    #[test]
    fn test_check_matching() {
        let target = PowerPc64::new();
        let runner = TestRunner::new(&target, false);
        let output = "; ModuleID = 'm'\ndefine void @f() {\nentry:\n";
        let directives = vec![
            CheckDirective::Check("ModuleID".to_string()),
            CheckDirective::CheckLabel("define void @f".to_string()),
            CheckDirective::CheckNext("entry:".to_string()),
        ];
        runner.validate_output(output, &directives).unwrap();
    }

    #[test]
    fn test_check_next_failure() {
        let target = PowerPc64::new();
        let runner = TestRunner::new(&target, false);
        let output = "Line 1\nLine 2\nLine 3\n";
        let directives = vec![
            CheckDirective::Check("Line 1".to_string()),
            CheckDirective::CheckNext("Line 3".to_string()),
        ];
        let result = runner.validate_output(output, &directives);
        assert!(result.unwrap_err().contains("CHECK-NEXT"));
    }

    #[test]
    fn test_expected_failure_is_rendered() {
        let target = PowerPc64::new();
        let runner = TestRunner::new(&target, false);
        let spec = TestSpec::parse(
            "; RUN: not liftdag %s
function bad {
  t0: ch = EntryToken
  t1: i64 = Constant
  t2: ch = Ret t0, t1
}",
        );
        let output = runner.execute(&spec.dag_content, &spec.run_directives[0]).unwrap();
        assert!(output.contains("error: "), "{output}");
    }
}
