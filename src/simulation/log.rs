//! Transition log written as a flat `;`-delimited table

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::core::error::Result;
use crate::core::types::{AgentId, AgentKind, RunId, Step};

pub const LOG_HEADER: [&str; 6] = ["run_id", "step", "agent_id", "agent_kind", "from_state", "to_state"];

/// One committed transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub run_id: RunId,
    /// 1-based step index within the run
    pub step: Step,
    pub agent_id: AgentId,
    pub agent_kind: AgentKind,
    pub from: String,
    pub to: String,
}

/// Ordered, append-only list of transitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionLog {
    records: Vec<TransitionRecord>,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TransitionRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, other: TransitionLog) {
        self.records.extend(other.records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
        csv.write_record(LOG_HEADER)?;
        for r in &self.records {
            csv.write_record([
                r.run_id.to_string().as_str(),
                r.step.to_string().as_str(),
                r.agent_id.to_string().as_str(),
                r.agent_kind.as_str(),
                r.from.as_str(),
                r.to.as_str(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }
}
