//! Sales Cycle - Markov agent simulation with value-proposition scoring
//!
//! Buyers and sellers move through externally supplied sales-cycle states.
//! Each step pulls the agent's row from a transition matrix, runs it through
//! an ordered pipeline of probability modifiers (value scoring among them),
//! and samples the next state.

pub mod catalog;
pub mod core;
pub mod pipeline;
pub mod scoring;
pub mod simulation;

pub use crate::core::{Result, RunConfig, SimError, SimulationConfig};
pub use crate::simulation::{simulate, SimulationContext, SimulationDriver, SimulationOutput};
