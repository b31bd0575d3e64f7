// Target descriptions. A target supplies the register file, the machine opcode table
// and the inverse selector; the rest of the lifter only talks to it through the
// traits in core::target.

//! Supported targets.

pub mod ppc;

pub use ppc::PowerPc64;

use crate::core::Target;

/// Names accepted by [`target_by_name`].
pub const TARGET_NAMES: &[&str] = &["ppc64"];

pub fn target_by_name(name: &str) -> Option<Box<dyn Target>> {
    match name {
        "ppc64" | "powerpc64" => Some(Box::new(PowerPc64::new())),
        _ => None,
    }
}
