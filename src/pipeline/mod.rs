//! Probability modifier pipeline and its plugin registry

pub mod modifier;
pub mod registry;
pub mod stage;
pub mod stages;

pub use modifier::{normalize, ModifiedRow, ModifierPipeline};
pub use registry::{PluginRegistry, PluginSpec, StageFactory, BUILTIN_ORIGIN};
pub use stage::{ProbabilityStage, StageContext};
