//! The single capability every pipeline stage implements

use rand::RngCore;

use crate::catalog::elements::{CategoryWeights, ElementCatalog, ValueElementSet};
use crate::catalog::states::StateCatalog;
use crate::core::error::Result;

/// Everything a stage may look at while transforming one row
///
/// The element set belongs to the stepping agent; stages may touch it
/// (counters and weight drift) but hold no agent state of their own.
pub struct StageContext<'a> {
    pub elements: &'a mut ValueElementSet,
    pub category_weights: &'a CategoryWeights,
    pub states: &'a StateCatalog,
    pub current_state: &'a str,
    pub current_index: usize,
    pub rng: &'a mut dyn RngCore,
}

impl StageContext<'_> {
    /// Index of the next state in catalog order, saturating at the last state
    pub fn next_index(&self) -> usize {
        (self.current_index + 1).min(self.states.len().saturating_sub(1))
    }
}

/// A probability modifier
///
/// Receives the current vector (same order as the state catalog) and
/// returns a new one of the same length. The pipeline renormalizes after
/// all stages have run, so a stage need not.
pub trait ProbabilityStage: Send + Sync {
    /// Name used in logs and manifests
    fn name(&self) -> &str;

    fn transform(&self, probabilities: &[f64], ctx: &mut StageContext<'_>) -> Result<Vec<f64>>;

    /// Check parameters against the loaded catalogs, once, before any run
    fn validate(&self, _elements: &ElementCatalog, _states: &StateCatalog) -> Result<()> {
        Ok(())
    }
}
