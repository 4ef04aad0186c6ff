//! Leader-side planning and coordination for the Railyard layout.
//!
//! The planner modules (`pathfind`, `planner`, `synth`) are pure; the
//! coordinator, radio, and executor own all the I/O. `main.rs` wires them
//! behind the operator REPL.

pub mod coordinator;
pub mod distances;
pub mod executor;
pub mod pathfind;
pub mod planner;
pub mod radio;
pub mod repl;
pub mod state;
pub mod synth;
