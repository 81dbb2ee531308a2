//! Sales Cycle - Entry Point
//!
//! Loads the state, transition and value-element tables plus a TOML run
//! configuration, runs every repetition and writes the transition log.

use clap::Parser;
use std::path::PathBuf;

use salescycle::catalog::loader;
use salescycle::core::error::Result;
use salescycle::core::RunConfig;
use salescycle::pipeline::PluginRegistry;
use salescycle::simulation::{SimulationContext, SimulationDriver};

/// Run a sales-cycle Markov simulation
#[derive(Parser, Debug)]
#[command(name = "salescycle")]
#[command(about = "Simulate buyers and sellers moving through sales-cycle states")]
struct Args {
    /// State catalog (`State;Id;Terminal`)
    #[arg(long)]
    states: PathBuf,

    /// Transition table
    #[arg(long)]
    transitions: PathBuf,

    /// Read the transition table as long rows (`from_state;to_state;probability`)
    #[arg(long)]
    long: bool,

    /// Value-element catalog (`element_name;category;weight;touch_count`)
    #[arg(long)]
    elements: Option<PathBuf>,

    /// Category weights (`category;weight`)
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Run configuration (`[simulation]` and `[[plugins]]`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Plugin manifest CSV (`Name;Import;Main Function`), appended after the TOML plugins
    #[arg(long)]
    plugins: Option<PathBuf>,

    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the configured number of repetitions
    #[arg(long)]
    runs: Option<u32>,

    /// Where to write the transition log
    #[arg(long, default_value = "transitions.csv")]
    output: PathBuf,

    /// Write the first agent's value elements here after the run
    #[arg(long)]
    persist_elements: Option<PathBuf>,

    /// Also write the full output as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("salescycle=info")),
        )
        .init();

    let args = Args::parse();

    let mut run = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(seed) = args.seed {
        run.simulation.seed = seed;
    }
    if let Some(runs) = args.runs {
        run.simulation.repetitions = runs;
    }
    if let Some(path) = &args.plugins {
        run.plugins.extend(loader::load_plugin_manifest(path)?);
    }
    run.simulation.validate()?;

    let states = loader::load_states(&args.states)?;
    let table = if args.long {
        loader::load_long_transitions(&args.transitions, Some(run.simulation.agent_kind))?
    } else {
        loader::load_wide_transitions(&args.transitions)?
    };
    let elements = match &args.elements {
        Some(path) => loader::load_value_elements(path)?,
        None => Default::default(),
    };
    let weights = match &args.weights {
        Some(path) => loader::load_category_weights(path)?,
        None => Default::default(),
    };

    let registry = PluginRegistry::with_builtins();
    let context = SimulationContext::assemble(&run, &states, &table, elements, weights, &registry)?;

    tracing::info!(
        seed = run.simulation.seed,
        runs = run.simulation.repetitions,
        "Sales Cycle starting..."
    );

    let output = SimulationDriver::new(context).run_all();

    output.combined_log().write_csv(&args.output)?;
    println!("{}", output.summary());
    println!("Transition log written to {}", args.output.display());

    if let Some(path) = &args.json {
        std::fs::write(path, output.to_json())?;
        println!("Full output written to {}", path.display());
    }

    if let Some(path) = &args.persist_elements {
        let first = output.runs.first().and_then(|r| r.trajectories.first());
        if let Some(trajectory) = first {
            trajectory.elements.persist(path)?;
            println!("Value elements written to {}", path.display());
        }
    }

    Ok(())
}
