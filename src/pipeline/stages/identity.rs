//! Pass-through stage

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::pipeline::registry::PluginSpec;
use crate::pipeline::stage::{ProbabilityStage, StageContext};

pub struct Identity {
    name: String,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ProbabilityStage for Identity {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, probabilities: &[f64], _ctx: &mut StageContext<'_>) -> Result<Vec<f64>> {
        Ok(probabilities.to_vec())
    }
}

pub fn build(spec: &PluginSpec, _config: &SimulationConfig) -> Result<Box<dyn ProbabilityStage>> {
    Ok(Box::new(Identity::new(spec.name.clone())))
}
