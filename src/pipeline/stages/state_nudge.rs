//! Additive nudge toward a target state while in a trigger state

use serde::Deserialize;

use crate::catalog::elements::ElementCatalog;
use crate::catalog::states::StateCatalog;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::pipeline::registry::PluginSpec;
use crate::pipeline::stage::{ProbabilityStage, StageContext};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateNudgeParams {
    pub trigger: String,
    pub target: String,
    #[serde(default = "default_adjustment")]
    pub adjustment: f64,
    #[serde(default = "default_cap")]
    pub cap: f64,
}

fn default_adjustment() -> f64 {
    0.2
}

fn default_cap() -> f64 {
    1.0
}

pub struct StateNudge {
    name: String,
    params: StateNudgeParams,
}

impl StateNudge {
    pub fn new(name: impl Into<String>, params: StateNudgeParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

impl ProbabilityStage for StateNudge {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, probabilities: &[f64], ctx: &mut StageContext<'_>) -> Result<Vec<f64>> {
        if ctx.current_state != self.params.trigger {
            return Ok(probabilities.to_vec());
        }
        let target = ctx
            .states
            .index_of(&self.params.target)
            .ok_or_else(|| SimError::StageFailed {
                stage: self.name.clone(),
                reason: format!("target state '{}' not in catalog", self.params.target),
            })?;

        let mut adjusted = probabilities.to_vec();
        if let Some(p) = adjusted.get_mut(target) {
            *p = (*p + self.params.adjustment).min(self.params.cap);
        }
        Ok(adjusted)
    }

    fn validate(&self, _elements: &ElementCatalog, states: &StateCatalog) -> Result<()> {
        for name in [&self.params.trigger, &self.params.target] {
            if states.index_of(name).is_none() {
                return Err(SimError::InvalidConfig(format!(
                    "plugin '{}': state '{}' is not in the catalog",
                    self.name, name
                )));
            }
        }
        Ok(())
    }
}

pub fn build(spec: &PluginSpec, _config: &SimulationConfig) -> Result<Box<dyn ProbabilityStage>> {
    let params: StateNudgeParams = spec.params_as()?;
    if !(params.adjustment.is_finite() && params.cap.is_finite()) {
        return Err(SimError::InvalidConfig(format!(
            "plugin '{}': adjustment and cap must be finite",
            spec.name
        )));
    }
    Ok(Box::new(StateNudge::new(spec.name.clone(), params)))
}
