pub mod config;
pub mod error;
pub mod types;

pub use config::{DriftConfig, RunConfig, SimulationConfig, StopMode};
pub use error::{Result, SimError};
pub use types::{AgentId, AgentKind, RunId, Step};
