//! Shared, read-only setup for every run

use tracing::{info, warn};

use crate::catalog::elements::{CategoryWeights, ElementCatalog};
use crate::catalog::matrix::{TransitionMatrix, TransitionTable};
use crate::catalog::states::StateCatalog;
use crate::core::config::{RunConfig, SimulationConfig};
use crate::core::error::Result;
use crate::pipeline::{ModifierPipeline, PluginRegistry};

/// Everything agents read while stepping
///
/// Built once, before any run starts. Construction performs all the
/// configuration checks, so a run never begins on a broken setup.
#[derive(Debug)]
pub struct SimulationContext {
    config: SimulationConfig,
    matrix: TransitionMatrix,
    elements: ElementCatalog,
    category_weights: CategoryWeights,
    pipeline: ModifierPipeline,
    terminal: Vec<bool>,
    start: usize,
}

impl SimulationContext {
    pub fn new(
        config: SimulationConfig,
        matrix: TransitionMatrix,
        elements: ElementCatalog,
        category_weights: CategoryWeights,
        pipeline: ModifierPipeline,
    ) -> Result<Self> {
        config.validate()?;
        category_weights.validate_against(&elements)?;
        pipeline.validate(&elements, matrix.states())?;

        let states = matrix.states();
        let mut terminal: Vec<bool> = (0..states.len()).map(|i| matrix.is_absorbing(i)).collect();
        for i in states.flagged_terminals() {
            terminal[i] = true;
        }
        for name in &config.terminal_states {
            terminal[states.require(name)?] = true;
        }

        let start = match &config.start_state {
            Some(name) => states.require(name)?,
            None => 0,
        };

        for (state, sum) in matrix.row_deviations(config.row_sum_tolerance) {
            if sum <= 0.0 && !terminal[states.require(&state)?] {
                warn!(state = %state, "state has no outgoing probability; agents reaching it stop");
            }
        }

        info!(
            states = states.len(),
            elements = elements.len(),
            stages = pipeline.len(),
            start = states.name(start),
            "simulation context ready"
        );

        Ok(Self {
            config,
            matrix,
            elements,
            category_weights,
            pipeline,
            terminal,
            start,
        })
    }

    /// Build the matrix and pipeline from raw tables and a run configuration
    pub fn assemble(
        run: &RunConfig,
        states: &StateCatalog,
        table: &TransitionTable,
        elements: ElementCatalog,
        category_weights: CategoryWeights,
        registry: &PluginRegistry,
    ) -> Result<Self> {
        let config = run.simulation.clone();
        config.validate()?;
        let matrix = TransitionMatrix::build(states, table, config.row_sum_tolerance)?;
        let pipeline = registry.build_pipeline(&run.plugins, &config)?;
        Self::new(config, matrix, elements, category_weights, pipeline)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    pub fn states(&self) -> &StateCatalog {
        self.matrix.states()
    }

    pub fn elements(&self) -> &ElementCatalog {
        &self.elements
    }

    pub fn category_weights(&self) -> &CategoryWeights {
        &self.category_weights
    }

    pub fn pipeline(&self) -> &ModifierPipeline {
        &self.pipeline
    }

    pub fn start_index(&self) -> usize {
        self.start
    }

    /// Absorbing in the matrix, flagged by the catalog, or listed in config
    pub fn is_terminal(&self, state: usize) -> bool {
        self.terminal.get(state).copied().unwrap_or(false)
    }
}
