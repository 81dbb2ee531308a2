//! Agents, sampling and the repetition driver

pub mod agent;
pub mod context;
pub mod driver;
pub mod log;
pub mod sampling;

pub use agent::{Agent, AgentStatus, StepOutcome};
pub use context::SimulationContext;
pub use driver::{simulate, AgentTrajectory, RunResult, RunSummary, SimulationDriver, SimulationOutput};
pub use log::{TransitionLog, TransitionRecord, LOG_HEADER};
pub use sampling::{draw, sample_index};
