//! Load catalog tables from `;`-delimited CSV files
//!
//! These readers only turn rows into catalog structures; every decision
//! about the data is made by the catalog types themselves.

use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::catalog::elements::{CategoryWeights, ElementCatalog, ValueElement};
use crate::catalog::matrix::TransitionTable;
use crate::catalog::states::{State, StateCatalog};
use crate::core::error::{Result, SimError};
use crate::core::types::AgentKind;
use crate::pipeline::PluginSpec;

/// Header of the first column in a wide transition table
pub const FROM_TO_HEADER: &str = "From/To";

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn open(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(SimError::MissingInput(path.display().to_string()));
    }
    Ok(File::open(path)?)
}

#[derive(Debug, Deserialize)]
struct StateRow {
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Id", default)]
    id: Option<u32>,
    #[serde(rename = "Terminal", default)]
    terminal: Option<bool>,
}

/// Read the state catalog (`State[;Id][;Terminal]`)
pub fn read_states<R: Read>(input: R) -> Result<StateCatalog> {
    let mut states = Vec::new();
    for row in reader(input).deserialize() {
        let row: StateRow = row?;
        states.push(State {
            name: row.state,
            position: states.len(),
            id: row.id,
            terminal: row.terminal.unwrap_or(false),
        });
    }
    StateCatalog::new(states)
}

pub fn load_states(path: &Path) -> Result<StateCatalog> {
    read_states(open(path)?)
}

/// Read a wide table: a `From/To` column followed by one column per to-state.
///
/// Empty cells are left out of the table so the matrix builder reports them
/// as missing.
pub fn read_wide_transitions<R: Read>(input: R) -> Result<TransitionTable> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    if headers.get(0) != Some(FROM_TO_HEADER) {
        return Err(SimError::InvalidConfig(format!(
            "transition table must start with a '{}' column",
            FROM_TO_HEADER
        )));
    }

    let mut table = TransitionTable::new();
    for record in rdr.records() {
        let record = record?;
        let Some(from) = record.get(0) else { continue };
        for (to, cell) in headers.iter().zip(record.iter()).skip(1) {
            if cell.is_empty() {
                continue;
            }
            let p: f64 = cell.parse().map_err(|_| {
                SimError::InvalidConfig(format!(
                    "cell '{}' from '{}' to '{}' is not a number",
                    cell, from, to
                ))
            })?;
            table.insert(from, to, p);
        }
    }
    Ok(table)
}

pub fn load_wide_transitions(path: &Path) -> Result<TransitionTable> {
    read_wide_transitions(open(path)?)
}

#[derive(Debug, Deserialize)]
struct LongRow {
    #[serde(default)]
    agent_type: Option<String>,
    from_state: String,
    to_state: String,
    probability: f64,
}

/// Read a long table (`[agent_type;]from_state;to_state;probability`).
///
/// With `kind` set, rows tagged for another agent kind are skipped; untagged
/// rows apply to every kind.
pub fn read_long_transitions<R: Read>(input: R, kind: Option<AgentKind>) -> Result<TransitionTable> {
    let mut table = TransitionTable::new();
    for row in reader(input).deserialize() {
        let row: LongRow = row?;
        if let (Some(kind), Some(tag)) = (kind, row.agent_type.as_deref()) {
            match AgentKind::parse(tag) {
                Some(tagged) if tagged == kind => {}
                Some(_) => continue,
                None => {
                    return Err(SimError::InvalidConfig(format!(
                        "unknown agent_type '{}'",
                        tag
                    )))
                }
            }
        }
        table.insert(row.from_state, row.to_state, row.probability);
    }
    Ok(table)
}

pub fn load_long_transitions(path: &Path, kind: Option<AgentKind>) -> Result<TransitionTable> {
    read_long_transitions(open(path)?, kind)
}

#[derive(Debug, Deserialize)]
struct ElementRow {
    element_name: String,
    category: String,
    weight: f64,
    #[serde(default)]
    touch_count: Option<u32>,
}

/// Read the value-element catalog (`element_name;category;weight[;touch_count]`)
pub fn read_value_elements<R: Read>(input: R) -> Result<ElementCatalog> {
    let mut elements = Vec::new();
    for row in reader(input).deserialize() {
        let row: ElementRow = row?;
        elements.push(ValueElement {
            name: row.element_name,
            category: row.category,
            weight: row.weight,
            touch_count: row.touch_count,
        });
    }
    ElementCatalog::new(elements)
}

pub fn load_value_elements(path: &Path) -> Result<ElementCatalog> {
    read_value_elements(open(path)?)
}

#[derive(Debug, Deserialize)]
struct WeightRow {
    category: String,
    weight: f64,
}

/// Read category weights (`category;weight`)
pub fn read_category_weights<R: Read>(input: R) -> Result<CategoryWeights> {
    let mut weights = CategoryWeights::new();
    for row in reader(input).deserialize() {
        let row: WeightRow = row?;
        weights.insert(row.category, row.weight);
    }
    Ok(weights)
}

pub fn load_category_weights(path: &Path) -> Result<CategoryWeights> {
    read_category_weights(open(path)?)
}

#[derive(Debug, Deserialize)]
struct ManifestRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Import")]
    origin: String,
    #[serde(rename = "Main Function")]
    entry: String,
}

/// Read a plugin manifest table (`Name;Import;Main Function`)
pub fn read_plugin_manifest<R: Read>(input: R) -> Result<Vec<PluginSpec>> {
    let mut specs = Vec::new();
    for row in reader(input).deserialize() {
        let row: ManifestRow = row?;
        specs.push(PluginSpec::new(row.name, row.origin, row.entry));
    }
    Ok(specs)
}

pub fn load_plugin_manifest(path: &Path) -> Result<Vec<PluginSpec>> {
    read_plugin_manifest(open(path)?)
}
