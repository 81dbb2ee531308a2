//! Transition matrix built from a From/To probability table
//!
//! The table is the raw tabular input (possibly sparse, possibly keyed by
//! names the catalog does not know). The matrix is the dense, validated,
//! immutable form the agents read from.

use ahash::AHashMap;
use tracing::warn;

use crate::catalog::states::StateCatalog;
use crate::core::error::{Result, SimError};

/// Raw From/To probabilities as read from a table
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    cells: AHashMap<String, AHashMap<String, f64>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one cell; a later insert for the same pair wins
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>, probability: f64) {
        self.cells
            .entry(from.into())
            .or_default()
            .insert(to.into(), probability);
    }

    pub fn get(&self, from: &str, to: &str) -> Option<f64> {
        self.cells.get(from).and_then(|row| row.get(to)).copied()
    }

    /// Number of populated cells
    pub fn len(&self) -> usize {
        self.cells.values().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Square row-stochastic matrix indexed by state position on both axes
#[derive(Debug, Clone)]
pub struct TransitionMatrix {
    states: StateCatalog,
    rows: Vec<Vec<f64>>,
    tolerance: f64,
}

impl TransitionMatrix {
    /// Look every (from, to) pair of the catalog up in the table.
    ///
    /// A missing cell is a configuration error. Rows that do not sum to 1
    /// within `tolerance` are kept as-is and reported with a warning.
    pub fn build(states: &StateCatalog, table: &TransitionTable, tolerance: f64) -> Result<Self> {
        let mut rows = Vec::with_capacity(states.len());
        for from in states.names() {
            let mut row = Vec::with_capacity(states.len());
            for to in states.names() {
                let p = table.get(from, to).ok_or_else(|| SimError::MissingCell {
                    from: from.to_string(),
                    to: to.to_string(),
                })?;
                if !p.is_finite() || p < 0.0 {
                    return Err(SimError::InvalidConfig(format!(
                        "probability {} from '{}' to '{}' is not a non-negative number",
                        p, from, to
                    )));
                }
                row.push(p);
            }
            rows.push(row);
        }

        let matrix = Self {
            states: states.clone(),
            rows,
            tolerance,
        };

        for (state, sum) in matrix.row_deviations(tolerance) {
            warn!(
                state = %state,
                row_sum = sum,
                "transition row does not sum to 1; it will be renormalized when sampled"
            );
        }

        Ok(matrix)
    }

    pub fn states(&self) -> &StateCatalog {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn row(&self, from: usize) -> &[f64] {
        &self.rows[from]
    }

    pub fn row_by_name(&self, from: &str) -> Option<&[f64]> {
        self.states.index_of(from).map(|i| self.row(i))
    }

    pub fn probability(&self, from: &str, to: &str) -> Option<f64> {
        let i = self.states.index_of(from)?;
        let j = self.states.index_of(to)?;
        Some(self.rows[i][j])
    }

    pub fn row_sum(&self, from: usize) -> f64 {
        self.rows[from].iter().sum()
    }

    /// Rows whose sum is further than `tolerance` from 1, as (state, sum)
    pub fn row_deviations(&self, tolerance: f64) -> Vec<(String, f64)> {
        (0..self.rows.len())
            .filter_map(|i| {
                let sum = self.row_sum(i);
                ((sum - 1.0).abs() > tolerance).then(|| (self.states.name(i).to_string(), sum))
            })
            .collect()
    }

    /// True when the only outgoing transition is the self-loop with probability 1
    pub fn is_absorbing(&self, state: usize) -> bool {
        self.rows[state].iter().enumerate().all(|(j, &p)| {
            if j == state {
                (p - 1.0).abs() <= self.tolerance
            } else {
                p.abs() <= self.tolerance
            }
        })
    }

    pub fn absorbing_states(&self) -> Vec<usize> {
        (0..self.rows.len()).filter(|&i| self.is_absorbing(i)).collect()
    }
}
