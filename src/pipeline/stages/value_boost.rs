//! Value-driven progression
//!
//! Scores a fixed offering against the agent's element set and makes the
//! next state in catalog order more or less likely depending on the score.
//! Every scored element is touched, so repeated evaluation slowly drifts the
//! agent's weights.

use serde::Deserialize;
use tracing::debug;

use crate::catalog::elements::{ElementAccess, ElementCatalog};
use crate::catalog::states::StateCatalog;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::pipeline::registry::PluginSpec;
use crate::pipeline::stage::{ProbabilityStage, StageContext};
use crate::scoring::{BuyerPreferences, Offering, UnknownElementPolicy, ValueScorer};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValueBoostParams {
    /// Explicit ratings; catalog elements not listed get `default_rating`
    pub offering: Offering,
    pub default_rating: f64,
    pub preferences: BuyerPreferences,
    /// Scores at or above this boost the next state
    pub high_score: f64,
    /// Scores below this damp the next state
    pub low_score: f64,
    pub boost: f64,
    pub damp: f64,
    /// Value every entry is flattened to when a table stake fails
    pub table_stakes_floor: f64,
    /// Touch scored elements (counter + weight drift)
    pub touch: bool,
}

impl Default for ValueBoostParams {
    fn default() -> Self {
        Self {
            offering: Offering::new(),
            default_rating: 7.0,
            preferences: BuyerPreferences::new(),
            high_score: 0.6,
            low_score: 0.3,
            boost: 1.5,
            damp: 0.5,
            table_stakes_floor: 0.01,
            touch: true,
        }
    }
}

pub struct ValueBoost {
    name: String,
    scorer: ValueScorer,
    params: ValueBoostParams,
}

impl ValueBoost {
    pub fn new(name: impl Into<String>, scorer: ValueScorer, params: ValueBoostParams) -> Self {
        Self {
            name: name.into(),
            scorer,
            params,
        }
    }

    fn offering_for<E: ElementAccess + ?Sized>(&self, elements: &E) -> Offering {
        let mut offering: Offering = elements
            .element_names()
            .into_iter()
            .map(|name| (name.to_string(), self.params.default_rating))
            .collect();
        for (name, rating) in &self.params.offering {
            offering.insert(name.clone(), *rating);
        }
        offering
    }
}

impl ValueBoostParams {
    /// Reject values that would fail or be discarded on every step
    pub fn check(&self) -> std::result::Result<(), String> {
        let is_rating = |r: f64| r.is_finite() && (0.0..=10.0).contains(&r);
        let is_factor = |v: f64| v.is_finite() && v >= 0.0;

        if !is_rating(self.default_rating) {
            return Err(format!("default_rating {} is outside [0, 10]", self.default_rating));
        }
        if let Some((name, rating)) = self.offering.iter().find(|(_, r)| !is_rating(**r)) {
            return Err(format!("offering rating {} for '{}' is outside [0, 10]", rating, name));
        }
        if let Some((name, m)) = self.preferences.iter().find(|(_, m)| !is_factor(**m)) {
            return Err(format!("preference {} for '{}' must be >= 0", m, name));
        }
        for (field, value) in [
            ("boost", self.boost),
            ("damp", self.damp),
            ("table_stakes_floor", self.table_stakes_floor),
        ] {
            if !is_factor(value) {
                return Err(format!("{} ({}) must be a non-negative number", field, value));
            }
        }
        let thresholds_ok = self.low_score.is_finite()
            && self.high_score.is_finite()
            && self.low_score <= self.high_score;
        if !thresholds_ok {
            return Err(format!(
                "low_score ({}) must not exceed high_score ({})",
                self.low_score, self.high_score
            ));
        }
        Ok(())
    }
}

impl ProbabilityStage for ValueBoost {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, probabilities: &[f64], ctx: &mut StageContext<'_>) -> Result<Vec<f64>> {
        let offering = self.offering_for(&*ctx.elements);
        let preferences = (!self.params.preferences.is_empty()).then_some(&self.params.preferences);
        let outcome = self
            .scorer
            .evaluate(&offering, &*ctx.elements, ctx.category_weights, preferences)?;

        if let Some(failed) = &outcome.detail.table_stakes_failed {
            debug!(stage = %self.name, element = %failed, "table stake failed; flattening row");
            return Ok(vec![self.params.table_stakes_floor; probabilities.len()]);
        }

        if self.params.touch {
            for name in outcome.detail.contributions.keys() {
                ctx.elements.update(name, &mut *ctx.rng);
            }
        }

        let mut adjusted = probabilities.to_vec();
        let next = ctx.next_index();
        if let Some(p) = adjusted.get_mut(next) {
            if outcome.score >= self.params.high_score {
                *p *= self.params.boost;
            } else if outcome.score < self.params.low_score {
                *p *= self.params.damp;
            }
        }

        debug!(stage = %self.name, score = outcome.score, next = next, "value score applied");
        Ok(adjusted)
    }

    /// Under `reject`, every named element must be in the catalog
    fn validate(&self, elements: &ElementCatalog, _states: &StateCatalog) -> Result<()> {
        if self.scorer.policy() != UnknownElementPolicy::Reject {
            return Ok(());
        }
        let named = self.params.offering.keys().chain(self.params.preferences.keys());
        for name in named {
            if elements.get(name).is_none() {
                return Err(SimError::InvalidConfig(format!(
                    "plugin '{}': element '{}' is not in the catalog",
                    self.name, name
                )));
            }
        }
        Ok(())
    }
}

pub fn build(spec: &PluginSpec, config: &SimulationConfig) -> Result<Box<dyn ProbabilityStage>> {
    let params: ValueBoostParams = spec.params_as()?;
    params
        .check()
        .map_err(|reason| SimError::InvalidConfig(format!("plugin '{}': {}", spec.name, reason)))?;
    Ok(Box::new(ValueBoost::new(
        spec.name.clone(),
        ValueScorer::new(config.unknown_element_policy),
        params,
    )))
}
