//! Ordered state catalog

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// One stage of the sales cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    /// Ordinal position in the catalog (0-based)
    pub position: usize,
    /// Optional external numeric id
    pub id: Option<u32>,
    /// Marked terminal by the catalog, independent of the matrix
    pub terminal: bool,
}

/// The ordered list of states, indexable by name
#[derive(Debug, Clone, Default)]
pub struct StateCatalog {
    states: Vec<State>,
    by_name: AHashMap<String, usize>,
}

impl StateCatalog {
    /// Build a catalog; positions are reassigned from the slice order
    pub fn new(states: Vec<State>) -> Result<Self> {
        let mut catalog = Self::default();
        for mut state in states {
            if catalog.by_name.contains_key(&state.name) {
                return Err(SimError::DuplicateState(state.name));
            }
            state.position = catalog.states.len();
            catalog.by_name.insert(state.name.clone(), state.position);
            catalog.states.push(state);
        }
        if catalog.states.is_empty() {
            return Err(SimError::MissingInput("state catalog is empty".into()));
        }
        Ok(catalog)
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Self::new(
            names
                .iter()
                .map(|n| State {
                    name: n.as_ref().to_string(),
                    position: 0,
                    id: None,
                    terminal: false,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Like `index_of` but a missing name is an error
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| SimError::UnknownState(name.to_string()))
    }

    pub fn name(&self, index: usize) -> &str {
        &self.states[index].name
    }

    pub fn get(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.name.as_str())
    }

    /// Indices of states flagged terminal by the catalog itself
    pub fn flagged_terminals(&self) -> Vec<usize> {
        self.states
            .iter()
            .filter(|s| s.terminal)
            .map(|s| s.position)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_follow_order() {
        let catalog = StateCatalog::from_names(&["Unaware", "Evaluating", "Closing"]).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.index_of("Evaluating"), Some(1));
        assert_eq!(catalog.name(2), "Closing");
        assert_eq!(catalog.get(2).unwrap().position, 2);
    }

    #[test]
    fn test_duplicate_state_rejected() {
        let err = StateCatalog::from_names(&["A", "B", "A"]).unwrap_err();
        assert!(matches!(err, SimError::DuplicateState(name) if name == "A"));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let empty: [&str; 0] = [];
        assert!(StateCatalog::from_names(&empty).is_err());
    }

    #[test]
    fn test_require_unknown_state() {
        let catalog = StateCatalog::from_names(&["A"]).unwrap();
        assert!(matches!(
            catalog.require("Z"),
            Err(SimError::UnknownState(_))
        ));
    }

    #[test]
    fn test_flagged_terminals() {
        let catalog = StateCatalog::new(vec![
            State { name: "A".into(), position: 9, id: Some(1), terminal: false },
            State { name: "Done".into(), position: 9, id: Some(2), terminal: true },
        ])
        .unwrap();
        assert_eq!(catalog.flagged_terminals(), vec![1]);
    }
}
