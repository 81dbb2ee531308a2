//! Simulation driver - repetitions, stopping rules and aggregate output

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

use crate::catalog::elements::ValueElementSet;
use crate::core::config::StopMode;
use crate::core::types::{AgentId, AgentKind, RunId, Step};
use crate::simulation::agent::{Agent, AgentStatus, StepOutcome};
use crate::simulation::context::SimulationContext;
use crate::simulation::log::{TransitionLog, TransitionRecord};

/// What became of one agent
#[derive(Debug, Clone, Serialize)]
pub struct AgentTrajectory {
    pub agent_id: AgentId,
    pub agent_kind: AgentKind,
    /// Visited state names, starting state first
    pub path: Vec<String>,
    pub steps: Step,
    pub status: AgentStatus,
    pub degraded_steps: u32,
    /// The agent's element set as it stood at the end of the run
    pub elements: ValueElementSet,
}

impl AgentTrajectory {
    pub fn final_state(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    pub fn absorbed(&self) -> bool {
        self.status == AgentStatus::Absorbed
    }
}

/// One repetition
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub seed: u64,
    pub trajectories: Vec<AgentTrajectory>,
    pub log: TransitionLog,
}

/// Distributions over all repetitions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub runs: u32,
    pub agents: u32,
    pub absorbed: u32,
    pub dead_ends: u32,
    pub budget_exhausted: u32,
    pub mean_path_length: f64,
    /// Steps taken → number of agents
    pub path_length_histogram: BTreeMap<Step, u32>,
    /// State → visits, starting states included
    pub state_visits: BTreeMap<String, u64>,
    pub final_states: BTreeMap<String, u32>,
    pub degraded_steps: u64,
}

impl RunSummary {
    pub fn from_runs(runs: &[RunResult]) -> Self {
        let mut summary = RunSummary {
            runs: runs.len() as u32,
            ..Default::default()
        };
        let mut total_steps: u64 = 0;

        for trajectory in runs.iter().flat_map(|r| &r.trajectories) {
            summary.agents += 1;
            match trajectory.status {
                AgentStatus::Absorbed => summary.absorbed += 1,
                AgentStatus::DeadEnd => summary.dead_ends += 1,
                AgentStatus::BudgetExhausted | AgentStatus::Active => summary.budget_exhausted += 1,
            }
            total_steps += trajectory.steps;
            summary.degraded_steps += trajectory.degraded_steps as u64;
            *summary.path_length_histogram.entry(trajectory.steps).or_insert(0) += 1;
            for state in &trajectory.path {
                *summary.state_visits.entry(state.clone()).or_insert(0) += 1;
            }
            if let Some(last) = trajectory.final_state() {
                *summary.final_states.entry(last.to_string()).or_insert(0) += 1;
            }
        }

        if summary.agents > 0 {
            summary.mean_path_length = total_steps as f64 / summary.agents as f64;
        }
        summary
    }
}

/// Complete output of a driver invocation
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutput {
    pub runs: Vec<RunResult>,
    pub summary: RunSummary,
    pub simulation_time_ms: u64,
}

impl SimulationOutput {
    pub fn new(runs: Vec<RunResult>, elapsed: Duration) -> Self {
        let summary = RunSummary::from_runs(&runs);
        Self {
            runs,
            summary,
            simulation_time_ms: elapsed.as_millis() as u64,
        }
    }

    /// Every run's log concatenated in run order
    pub fn combined_log(&self) -> TransitionLog {
        let mut log = TransitionLog::new();
        for run in &self.runs {
            log.extend(run.log.clone());
        }
        log
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn summary(&self) -> String {
        let s = &self.summary;
        let mut text = format!(
            "Simulated {} runs ({} agents) in {}ms\n{} absorbed, {} dead ends, {} out of steps; mean path length {:.2}",
            s.runs,
            s.agents,
            self.simulation_time_ms,
            s.absorbed,
            s.dead_ends,
            s.budget_exhausted,
            s.mean_path_length,
        );
        if s.degraded_steps > 0 {
            text.push_str(&format!("\n{} degraded steps", s.degraded_steps));
        }
        for (state, count) in &s.final_states {
            text.push_str(&format!("\n  ended in {}: {}", state, count));
        }
        text
    }
}

/// Runs agents over a shared context
pub struct SimulationDriver {
    context: SimulationContext,
}

impl SimulationDriver {
    pub fn new(context: SimulationContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    /// Seed of repetition `run`
    pub fn seed_for(&self, run: RunId) -> u64 {
        self.context.config().seed.wrapping_add(run.0 as u64)
    }

    /// One repetition with its own RNG.
    ///
    /// Agents take turns, one step each per round, until every agent has
    /// stopped or the step budget is used up.
    pub fn run_once(&self, run: RunId) -> RunResult {
        let config = self.context.config();
        let seed = self.seed_for(run);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut log = TransitionLog::new();

        let mut agents: Vec<Agent<'_>> = (0..config.agents_per_run)
            .map(|i| Agent::new(AgentId(i), config.agent_kind, &self.context))
            .collect();

        let until_absorbed = config.stop_mode == StopMode::UntilAbsorbed;

        for step in 1..=config.max_steps {
            let mut any_active = false;
            for agent in agents.iter_mut().filter(|a| a.is_active()) {
                if until_absorbed && agent.is_terminal() {
                    agent.set_status(AgentStatus::Absorbed);
                    continue;
                }
                match agent.step(&mut rng) {
                    StepOutcome::Transition { from, to, .. } => {
                        let states = self.context.states();
                        log.push(TransitionRecord {
                            run_id: run,
                            step,
                            agent_id: agent.id(),
                            agent_kind: agent.kind(),
                            from: states.name(from).to_string(),
                            to: states.name(to).to_string(),
                        });
                        any_active = true;
                    }
                    StepOutcome::DeadEnd { .. } => agent.set_status(AgentStatus::DeadEnd),
                }
            }
            if !any_active {
                break;
            }
        }

        for agent in agents.iter_mut().filter(|a| a.is_active()) {
            let status = if agent.is_terminal() {
                AgentStatus::Absorbed
            } else {
                AgentStatus::BudgetExhausted
            };
            agent.set_status(status);
        }

        let states = self.context.states();
        let trajectories = agents
            .into_iter()
            .map(|agent| {
                let agent_id = agent.id();
                let agent_kind = agent.kind();
                let steps = agent.steps();
                let status = agent.status();
                let degraded_steps = agent.degraded_steps();
                let (elements, history) = agent.into_parts();
                AgentTrajectory {
                    agent_id,
                    agent_kind,
                    path: history.iter().map(|&i| states.name(i).to_string()).collect(),
                    steps,
                    status,
                    degraded_steps,
                    elements,
                }
            })
            .collect();

        RunResult {
            run_id: run,
            seed,
            trajectories,
            log,
        }
    }

    /// All configured repetitions, on the rayon pool when `parallel` is set.
    /// Output is identical either way.
    pub fn run_all(&self) -> SimulationOutput {
        let start = std::time::Instant::now();
        let config = self.context.config();

        let runs: Vec<RunResult> = if config.parallel {
            (0..config.repetitions)
                .into_par_iter()
                .map(|r| self.run_once(RunId(r)))
                .collect()
        } else {
            (0..config.repetitions).map(|r| self.run_once(RunId(r))).collect()
        };

        let output = SimulationOutput::new(runs, start.elapsed());
        info!(
            runs = output.summary.runs,
            absorbed = output.summary.absorbed,
            mean_path_length = output.summary.mean_path_length,
            "simulation finished"
        );
        output
    }
}

/// Run every repetition described by the context's configuration
pub fn simulate(context: SimulationContext) -> SimulationOutput {
    SimulationDriver::new(context).run_all()
}
