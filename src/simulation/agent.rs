//! Agent state machine

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::elements::ValueElementSet;
use crate::core::types::{AgentId, AgentKind, Step};
use crate::pipeline::StageContext;
use crate::simulation::context::SimulationContext;
use crate::simulation::sampling::{draw, sample_index};

/// Where an agent is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    /// Reached a terminal state
    Absorbed,
    /// Row had no positive mass, even before modification
    DeadEnd,
    /// Ran out of steps in a non-terminal state
    BudgetExhausted,
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Transition {
        from: usize,
        to: usize,
        skipped_stages: Vec<String>,
        fell_back: bool,
    },
    /// Nothing could be sampled; the agent stays put
    DeadEnd { state: usize },
}

/// One simulated buyer or seller
pub struct Agent<'a> {
    id: AgentId,
    kind: AgentKind,
    ctx: &'a SimulationContext,
    current: usize,
    elements: ValueElementSet,
    history: Vec<usize>,
    status: AgentStatus,
    steps: Step,
    degraded_steps: u32,
}

impl<'a> Agent<'a> {
    /// Spawn in the context's start state with a fresh copy of the elements
    pub fn new(id: AgentId, kind: AgentKind, ctx: &'a SimulationContext) -> Self {
        let start = ctx.start_index();
        Self {
            id,
            kind,
            ctx,
            current: start,
            elements: ValueElementSet::from_catalog(ctx.elements(), ctx.config().drift.clone()),
            history: vec![start],
            status: AgentStatus::Active,
            steps: 0,
            degraded_steps: 0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_state(&self) -> &'a str {
        self.ctx.states().name(self.current)
    }

    pub fn elements(&self) -> &ValueElementSet {
        &self.elements
    }

    /// Visited state indices, starting state first
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn set_status(&mut self, status: AgentStatus) {
        self.status = status;
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    pub fn is_terminal(&self) -> bool {
        self.ctx.is_terminal(self.current)
    }

    pub fn steps(&self) -> Step {
        self.steps
    }

    /// Steps on which a stage was skipped or the fallback row was used
    pub fn degraded_steps(&self) -> u32 {
        self.degraded_steps
    }

    /// Draw `u` from the run RNG and take one step
    pub fn step<R: RngCore>(&mut self, rng: &mut R) -> StepOutcome {
        let u = draw(rng);
        self.step_with_draw(u, rng)
    }

    /// Take one step with a caller-supplied draw `u` in `[0, 1)`.
    ///
    /// The current row runs through the pipeline, the next state is the
    /// smallest index whose cumulative probability reaches `u`, and the
    /// result is committed to the history. `rng` is only handed to stages.
    pub fn step_with_draw(&mut self, u: f64, rng: &mut dyn RngCore) -> StepOutcome {
        let ctx = self.ctx;
        let from = self.current;
        let states = ctx.states();

        let modified = {
            let mut stage_ctx = StageContext {
                elements: &mut self.elements,
                category_weights: ctx.category_weights(),
                states,
                current_state: states.name(from),
                current_index: from,
                rng,
            };
            ctx.pipeline().apply(ctx.matrix().row(from), &mut stage_ctx)
        };

        let next = if modified.dead_end {
            None
        } else {
            sample_index(&modified.probabilities, u)
        };
        let Some(to) = next else {
            warn!(agent = %self.id, state = states.name(from), "no outgoing probability; agent stops");
            return StepOutcome::DeadEnd { state: from };
        };

        if modified.is_degraded() {
            self.degraded_steps += 1;
        }
        self.current = to;
        self.history.push(to);
        self.steps += 1;

        debug!(
            agent = %self.id,
            from = states.name(from),
            to = states.name(to),
            u = u,
            "transition"
        );

        StepOutcome::Transition {
            from,
            to,
            skipped_stages: modified.skipped_stages,
            fell_back: modified.fell_back,
        }
    }

    /// Hand back the element set and history at the end of a run
    pub fn into_parts(self) -> (ValueElementSet, Vec<usize>) {
        (self.elements, self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::elements::{CategoryWeights, ElementCatalog};
    use crate::catalog::matrix::{TransitionMatrix, TransitionTable};
    use crate::catalog::states::StateCatalog;
    use crate::core::config::SimulationConfig;
    use crate::core::error::Result;
    use crate::pipeline::{ModifierPipeline, ProbabilityStage};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn matrix(rows: &[(&str, [f64; 3])]) -> TransitionMatrix {
        let states = StateCatalog::from_names(&["A", "B", "C"]).unwrap();
        let mut table = TransitionTable::new();
        for (from, row) in rows {
            for (to, p) in ["A", "B", "C"].iter().zip(row) {
                table.insert(*from, *to, *p);
            }
        }
        TransitionMatrix::build(&states, &table, 1e-6).unwrap()
    }

    fn abc_context(pipeline: ModifierPipeline) -> SimulationContext {
        let m = matrix(&[
            ("A", [0.5, 0.5, 0.0]),
            ("B", [0.0, 0.3, 0.7]),
            ("C", [0.0, 0.0, 1.0]),
        ]);
        SimulationContext::new(
            SimulationConfig::default(),
            m,
            ElementCatalog::default(),
            CategoryWeights::new(),
            pipeline,
        )
        .unwrap()
    }

    #[test]
    fn test_pinned_draws() {
        let ctx = abc_context(ModifierPipeline::new());
        let mut agent = Agent::new(AgentId(0), AgentKind::Buyer, &ctx);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        agent.step_with_draw(0.4, &mut rng);
        agent.step_with_draw(0.9, &mut rng);
        assert_eq!(agent.history(), &[0, 0, 1]);
        assert_eq!(agent.current_state(), "B");
        assert_eq!(agent.steps(), 2);
    }

    #[test]
    fn test_absorbed_agent_stays() {
        let ctx = abc_context(ModifierPipeline::new());
        let mut agent = Agent::new(AgentId(0), AgentKind::Seller, &ctx);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        agent.step_with_draw(0.9, &mut rng);
        agent.step_with_draw(0.9, &mut rng);
        assert!(agent.is_terminal());
        let outcome = agent.step(&mut rng);
        assert!(matches!(outcome, StepOutcome::Transition { from: 2, to: 2, .. }));
    }

    #[test]
    fn test_dead_end_row() {
        let m = matrix(&[
            ("A", [0.0, 1.0, 0.0]),
            ("B", [0.0, 0.0, 0.0]),
            ("C", [0.0, 0.0, 1.0]),
        ]);
        let ctx = SimulationContext::new(
            SimulationConfig::default(),
            m,
            ElementCatalog::default(),
            CategoryWeights::new(),
            ModifierPipeline::new(),
        )
        .unwrap();
        let mut agent = Agent::new(AgentId(3), AgentKind::Buyer, &ctx);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        agent.step(&mut rng);
        assert_eq!(agent.step(&mut rng), StepOutcome::DeadEnd { state: 1 });
        assert_eq!(agent.history(), &[0, 1]);
    }

    struct Zero;
    impl ProbabilityStage for Zero {
        fn name(&self) -> &str {
            "zero"
        }
        fn transform(&self, p: &[f64], _ctx: &mut StageContext<'_>) -> Result<Vec<f64>> {
            Ok(vec![0.0; p.len()])
        }
    }

    #[test]
    fn test_fallback_counts_as_degraded() {
        let ctx = abc_context(ModifierPipeline::new().with_stage(Box::new(Zero)));
        let mut agent = Agent::new(AgentId(0), AgentKind::Buyer, &ctx);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = agent.step_with_draw(0.9, &mut rng);
        assert!(matches!(outcome, StepOutcome::Transition { to: 1, fell_back: true, .. }));
        assert_eq!(agent.degraded_steps(), 1);
    }
}
