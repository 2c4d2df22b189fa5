//! Traversal: run state, input wiring and the opportunity queue.
//!
//! Everything here is synchronous. The run controller drives a `Traversal`
//! one step at a time and invokes handlers in between.

mod machine;
mod state;
mod step;

pub use machine::Traversal;
pub use state::RunState;
pub use step::{compute_step, missing_inputs, wire_inputs, StepInputs, TraversalResult};
