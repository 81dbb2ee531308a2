//! Value elements, category weights and the agent-owned element set
//!
//! `ElementCatalog` is the read-only catalog loaded at setup.
//! `ValueElementSet` is the per-agent working copy that pipeline stages
//! touch: each touch bumps the element's counter and drifts its weight a
//! little around the catalog value. Writing the set back to disk is an
//! explicit `persist` call and never happens while stepping.

use ahash::AHashMap;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::core::config::DriftConfig;
use crate::core::error::{Result, SimError};

/// Category name that turns an element into a hard floor
pub const TABLE_STAKES: &str = "table_stakes";

/// One row of the value-element catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueElement {
    pub name: String,
    pub category: String,
    pub weight: f64,
    pub touch_count: Option<u32>,
}

impl ValueElement {
    pub fn new(name: impl Into<String>, category: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            weight,
            touch_count: None,
        }
    }

    pub fn is_table_stakes(&self) -> bool {
        self.category == TABLE_STAKES
    }
}

/// Weight and category of an element as seen by the scorer
#[derive(Debug, Clone, Copy)]
pub struct ElementView<'a> {
    pub weight: f64,
    pub category: &'a str,
}

impl ElementView<'_> {
    pub fn is_table_stakes(&self) -> bool {
        self.category == TABLE_STAKES
    }
}

/// Read access to elements by name, shared by the catalog and agent sets
pub trait ElementAccess {
    fn element(&self, name: &str) -> Option<ElementView<'_>>;

    /// Element names in catalog order
    fn element_names(&self) -> Vec<&str>;
}

/// Read-only catalog of value elements, in file order
#[derive(Debug, Clone, Default)]
pub struct ElementCatalog {
    elements: Vec<ValueElement>,
    index: AHashMap<String, usize>,
}

impl ElementCatalog {
    pub fn new(elements: Vec<ValueElement>) -> Result<Self> {
        let mut catalog = Self::default();
        for element in elements {
            if catalog.index.contains_key(&element.name) {
                return Err(SimError::InvalidConfig(format!(
                    "duplicate value element '{}'",
                    element.name
                )));
            }
            if !element.weight.is_finite() {
                return Err(SimError::InvalidConfig(format!(
                    "value element '{}' has a non-finite weight",
                    element.name
                )));
            }
            catalog.index.insert(element.name.clone(), catalog.elements.len());
            catalog.elements.push(element);
        }
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&ValueElement> {
        self.index.get(name).map(|&i| &self.elements[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValueElement> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ElementAccess for ElementCatalog {
    fn element(&self, name: &str) -> Option<ElementView<'_>> {
        self.get(name).map(|e| ElementView {
            weight: e.weight,
            category: &e.category,
        })
    }

    fn element_names(&self) -> Vec<&str> {
        self.elements.iter().map(|e| e.name.as_str()).collect()
    }
}

/// Category → weight. Weights need not sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    weights: BTreeMap<String, f64>,
}

impl CategoryWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, weight: f64) {
        self.weights.insert(category.into(), weight);
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.weights.get(category).copied()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.weights.contains_key(category)
    }

    /// Categories in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Every category referenced by the catalog must have a weight
    pub fn validate_against<E: ElementAccess + ?Sized>(&self, elements: &E) -> Result<()> {
        for name in elements.element_names() {
            if let Some(view) = elements.element(name) {
                if !self.contains(view.category) {
                    return Err(SimError::MissingCategoryWeight {
                        category: view.category.to_string(),
                        element: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for CategoryWeights {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Working state of a single element inside an agent's set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    pub name: String,
    pub category: String,
    pub weight: f64,
    pub original_weight: f64,
    pub touch_count: u32,
}

/// Agent-owned, versioned copy of the element catalog
#[derive(Debug, Clone, Serialize)]
pub struct ValueElementSet {
    entries: Vec<ElementState>,
    #[serde(skip)]
    index: AHashMap<String, usize>,
    drift: DriftConfig,
    version: u64,
}

impl ValueElementSet {
    pub fn from_catalog(catalog: &ElementCatalog, drift: DriftConfig) -> Self {
        let entries: Vec<ElementState> = catalog
            .iter()
            .map(|e| ElementState {
                name: e.name.clone(),
                category: e.category.clone(),
                weight: e.weight,
                original_weight: e.weight,
                touch_count: e.touch_count.unwrap_or(0),
            })
            .collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        Self {
            entries,
            index,
            drift,
            version: 0,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ElementState> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementState> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bumped once per successful `update`
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn total_touches(&self) -> u64 {
        self.entries.iter().map(|e| e.touch_count as u64).sum()
    }

    /// Touch an element: count it and drift its weight.
    ///
    /// The weight moves by a uniform jitter proportional to the original
    /// weight, is clamped, then pulled part of the way back toward the
    /// original. Returns false for names not in the set.
    pub fn update<R: RngCore + ?Sized>(&mut self, name: &str, rng: &mut R) -> bool {
        let Some(&i) = self.index.get(name) else {
            return false;
        };
        let drift = &self.drift;
        let entry = &mut self.entries[i];

        let jitter = if drift.jitter > 0.0 {
            rng.gen_range(-drift.jitter..=drift.jitter)
        } else {
            0.0
        };
        let drifted = (entry.weight + jitter * entry.original_weight)
            .clamp(drift.min_weight, drift.max_weight);
        entry.weight = drifted + drift.pull * (entry.original_weight - drifted);
        entry.touch_count += 1;

        self.version += 1;
        debug!(element = %name, weight = entry.weight, touches = entry.touch_count, "element touched");
        true
    }

    /// Write the set back as `element_name;weight;category;touch_count`.
    ///
    /// Weights are written as loaded from the catalog; drift is not saved.
    /// Touch counts are saved as they stand.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.persist_to(file)
    }

    pub fn persist_to<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
        csv.write_record(["element_name", "weight", "category", "touch_count"])?;
        for entry in &self.entries {
            csv.write_record([
                entry.name.as_str(),
                entry.original_weight.to_string().as_str(),
                entry.category.as_str(),
                entry.touch_count.to_string().as_str(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }
}

impl ElementAccess for ValueElementSet {
    fn element(&self, name: &str) -> Option<ElementView<'_>> {
        self.get(name).map(|e| ElementView {
            weight: e.weight,
            category: &e.category,
        })
    }

    fn element_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}
