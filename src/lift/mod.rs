// Lifting from operation graphs to IR. select runs the target's reverse instruction
// selector over a graph; emitter and ops lower canonical nodes to IR with memoization;
// context and materializer hold the per-function translation state; lifter ties the
// stages together for a sequence of functions.

//! Graph-to-IR lifting.

pub mod context;
pub mod emitter;
pub mod lifter;
pub mod materializer;
mod ops;
pub mod select;

pub use context::{NameResolver, NodeValues, TranslationContext, VisitCache};
pub use emitter::DagEmitter;
pub use lifter::Lifter;
pub use materializer::{RegisterError, RegisterMaterializer, RegisterScope};
pub use select::{fixup_canonical, select_dag, SelectCx};
