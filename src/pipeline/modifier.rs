//! Ordered modifier pipeline with renormalization and fallback

use tracing::warn;

use crate::catalog::elements::ElementCatalog;
use crate::catalog::states::StateCatalog;
use crate::core::error::Result;
use crate::pipeline::stage::{ProbabilityStage, StageContext};

/// Scale a vector to sum to 1; `None` when the total is not positive
pub fn normalize(values: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = values.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    Some(values.iter().map(|v| v / total).collect())
}

/// Result of running one row through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ModifiedRow {
    /// Normalized probabilities, empty when `dead_end` is set
    pub probabilities: Vec<f64>,
    /// Stages whose output was discarded
    pub skipped_stages: Vec<String>,
    /// The modified vector summed to <= 0 and the input row was used instead
    pub fell_back: bool,
    /// Neither the modified nor the input row had positive mass
    pub dead_end: bool,
}

impl ModifiedRow {
    pub fn is_degraded(&self) -> bool {
        self.fell_back || !self.skipped_stages.is_empty()
    }
}

/// Stages applied in registration order
#[derive(Default)]
pub struct ModifierPipeline {
    stages: Vec<Box<dyn ProbabilityStage>>,
}

impl std::fmt::Debug for ModifierPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

impl ModifierPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Box<dyn ProbabilityStage>) {
        self.stages.push(stage);
    }

    pub fn with_stage(mut self, stage: Box<dyn ProbabilityStage>) -> Self {
        self.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Let every stage check its parameters against the catalogs
    pub fn validate(&self, elements: &ElementCatalog, states: &StateCatalog) -> Result<()> {
        for stage in &self.stages {
            stage.validate(elements, states)?;
        }
        Ok(())
    }

    /// Run every stage, then renormalize.
    ///
    /// A stage that returns an error or a malformed vector is skipped
    /// and the previous vector carries on. If the final vector has no
    /// positive mass the unmodified row is used instead.
    pub fn apply(&self, row: &[f64], ctx: &mut StageContext<'_>) -> ModifiedRow {
        let mut current = row.to_vec();
        let mut skipped_stages = Vec::new();

        for stage in &self.stages {
            let reason = match stage.transform(&current, ctx) {
                Ok(next) => match check_shape(&next, row.len()) {
                    None => {
                        current = next;
                        continue;
                    }
                    Some(problem) => problem,
                },
                Err(e) => e.to_string(),
            };
            warn!(
                stage = stage.name(),
                state = ctx.current_state,
                reason = %reason,
                "pipeline stage skipped"
            );
            skipped_stages.push(stage.name().to_string());
        }

        if let Some(probabilities) = normalize(&current) {
            return ModifiedRow {
                probabilities,
                skipped_stages,
                fell_back: false,
                dead_end: false,
            };
        }

        match normalize(row) {
            Some(probabilities) => {
                warn!(
                    state = ctx.current_state,
                    "modified probabilities sum to <= 0; using the unmodified row"
                );
                ModifiedRow {
                    probabilities,
                    skipped_stages,
                    fell_back: true,
                    dead_end: false,
                }
            }
            None => ModifiedRow {
                probabilities: Vec::new(),
                skipped_stages,
                fell_back: false,
                dead_end: true,
            },
        }
    }
}

fn check_shape(values: &[f64], expected: usize) -> Option<String> {
    if values.len() != expected {
        return Some(format!("returned {} entries, expected {}", values.len(), expected));
    }
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Some("returned a negative or non-finite probability".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::elements::{CategoryWeights, ElementCatalog, ValueElementSet};
    use crate::catalog::states::StateCatalog;
    use crate::core::config::DriftConfig;
    use crate::core::error::SimError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Scale(f64);
    impl ProbabilityStage for Scale {
        fn name(&self) -> &str {
            "scale"
        }
        fn transform(&self, p: &[f64], _ctx: &mut StageContext<'_>) -> Result<Vec<f64>> {
            Ok(p.iter().map(|v| v * self.0).collect())
        }
    }

    struct BoostLast;
    impl ProbabilityStage for BoostLast {
        fn name(&self) -> &str {
            "boost_last"
        }
        fn transform(&self, p: &[f64], _ctx: &mut StageContext<'_>) -> Result<Vec<f64>> {
            let mut out = p.to_vec();
            if let Some(last) = out.last_mut() {
                *last += 1.0;
            }
            Ok(out)
        }
    }

    struct Failing;
    impl ProbabilityStage for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn transform(&self, _p: &[f64], _ctx: &mut StageContext<'_>) -> Result<Vec<f64>> {
            Err(SimError::StageFailed {
                stage: "failing".into(),
                reason: "no data".into(),
            })
        }
    }

    struct Truncating;
    impl ProbabilityStage for Truncating {
        fn name(&self) -> &str {
            "truncating"
        }
        fn transform(&self, p: &[f64], _ctx: &mut StageContext<'_>) -> Result<Vec<f64>> {
            Ok(p[..1].to_vec())
        }
    }

    fn run(pipeline: &ModifierPipeline, row: &[f64]) -> ModifiedRow {
        let states = StateCatalog::from_names(&["A", "B", "C"]).unwrap();
        let weights = CategoryWeights::new();
        let mut elements =
            ValueElementSet::from_catalog(&ElementCatalog::default(), DriftConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut ctx = StageContext {
            elements: &mut elements,
            category_weights: &weights,
            states: &states,
            current_state: "A",
            current_index: 0,
            rng: &mut rng,
        };
        pipeline.apply(row, &mut ctx)
    }

    #[test]
    fn test_empty_pipeline_normalizes_row() {
        let out = run(&ModifierPipeline::new(), &[1.0, 1.0, 2.0]);
        assert_eq!(out.probabilities, vec![0.25, 0.25, 0.5]);
        assert!(!out.is_degraded());
    }

    #[test]
    fn test_stages_apply_in_order() {
        // [0.5, 0.5, 0] * 2 = [1, 1, 0], then +1 on the last entry
        let pipeline = ModifierPipeline::new()
            .with_stage(Box::new(Scale(2.0)))
            .with_stage(Box::new(BoostLast));
        let out = run(&pipeline, &[0.5, 0.5, 0.0]);
        assert_eq!(out.probabilities, vec![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);

        // [1, 0, 0] -> [1, 0, 1] -> [2, 0, 2]
        let pipeline = ModifierPipeline::new()
            .with_stage(Box::new(BoostLast))
            .with_stage(Box::new(Scale(2.0)));
        let out = run(&pipeline, &[1.0, 0.0, 0.0]);
        assert_eq!(out.probabilities, vec![0.5, 0.0, 0.5]);
        assert_eq!(pipeline.stage_names(), vec!["boost_last", "scale"]);
    }

    #[test]
    fn test_zero_mass_falls_back_to_input() {
        let pipeline = ModifierPipeline::new().with_stage(Box::new(Scale(0.0)));
        let out = run(&pipeline, &[0.2, 0.8, 0.0]);
        assert!(out.fell_back);
        assert!(!out.dead_end);
        assert!((out.probabilities[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_failing_stage_is_skipped() {
        let pipeline = ModifierPipeline::new()
            .with_stage(Box::new(Failing))
            .with_stage(Box::new(BoostLast));
        let out = run(&pipeline, &[1.0, 0.0, 0.0]);
        assert_eq!(out.skipped_stages, vec!["failing".to_string()]);
        assert_eq!(out.probabilities, vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_failing_stage_keeps_prior_vector() {
        // Scale runs, then the failure leaves its output untouched
        let pipeline = ModifierPipeline::new()
            .with_stage(Box::new(Scale(3.0)))
            .with_stage(Box::new(Failing))
            .with_stage(Box::new(BoostLast));
        let out = run(&pipeline, &[1.0, 0.0, 0.0]);
        // [3, 0, 0] -> skipped -> [3, 0, 1]
        assert_eq!(out.skipped_stages, vec!["failing".to_string()]);
        assert_eq!(out.probabilities, vec![0.75, 0.0, 0.25]);
        assert!(!out.fell_back);
    }

    #[test]
    fn test_malformed_output_is_skipped() {
        let pipeline = ModifierPipeline::new().with_stage(Box::new(Truncating));
        let out = run(&pipeline, &[1.0, 1.0, 0.0]);
        assert!(out.is_degraded());
        assert_eq!(out.probabilities.len(), 3);
    }

    #[test]
    fn test_dead_row() {
        let out = run(&ModifierPipeline::new(), &[0.0, 0.0, 0.0]);
        assert!(out.dead_end);
        assert!(out.probabilities.is_empty());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(&[2.0, 2.0]), Some(vec![0.5, 0.5]));
        assert_eq!(normalize(&[0.0, 0.0]), None);
        assert_eq!(normalize(&[]), None);
    }
}
