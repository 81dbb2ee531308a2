//! Read-only catalogs built once per simulation setup

pub mod elements;
pub mod loader;
pub mod matrix;
pub mod states;

pub use elements::{
    CategoryWeights, ElementAccess, ElementCatalog, ElementState, ElementView, ValueElement,
    ValueElementSet, TABLE_STAKES,
};
pub use matrix::{TransitionMatrix, TransitionTable};
pub use states::{State, StateCatalog};
