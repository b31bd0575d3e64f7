//! Lifting options.

/// Knobs for one lifting run, built by the driver from its command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiftOptions {
    /// Run the reverse instruction selector before emission.
    pub run_selector: bool,
    /// Longest operand path the emitter follows before giving up on a graph.
    pub max_depth: usize,
}

impl Default for LiftOptions {
    fn default() -> Self {
        Self { run_selector: true, max_depth: 4096 }
    }
}
