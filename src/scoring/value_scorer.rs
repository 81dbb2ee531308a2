//! Value-proposition scoring - rates an offering against the element catalog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::catalog::elements::{CategoryWeights, ElementAccess};
use crate::core::error::{Result, SimError};

/// Element → rating on a 0-10 scale
pub type Offering = BTreeMap<String, f64>;

/// Element → multiplier on the catalog weight
pub type BuyerPreferences = BTreeMap<String, f64>;

/// Ratings below this on a table-stakes element void the offer
pub const TABLE_STAKES_MIN_RATING: f64 = 6.0;

/// Ratings at or above this earn the full weight
pub const EXCELLENT_RATING: f64 = 8.0;

/// Ratings at or above this (and below excellent) earn half the weight
pub const GOOD_RATING: f64 = 6.0;

const GOOD_FACTOR: f64 = 0.5;
const POOR_FACTOR: f64 = 0.1;

/// What to do with offering elements that are not in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownElementPolicy {
    /// Fail the evaluation with a validation error
    Reject,
    /// Leave the element out and log a warning
    #[default]
    DropWithWarning,
}

/// Breakdown of a score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetail {
    /// Set when the table-stakes gate zeroed the score
    pub table_stakes_failed: Option<String>,
    /// Mean contribution per category (every weighted category is present)
    pub category_scores: BTreeMap<String, f64>,
    /// Banded contribution per scored element
    pub contributions: BTreeMap<String, f64>,
    /// Offering elements left out under `DropWithWarning`
    pub dropped: Vec<String>,
}

/// Overall score plus detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: f64,
    pub detail: ScoreDetail,
}

impl ScoreOutcome {
    pub fn failed_table_stakes(&self) -> bool {
        self.detail.table_stakes_failed.is_some()
    }
}

/// Banded contribution of one element.
///
/// Excellent ratings earn the full effective weight, good ratings half of
/// it and poor ratings a tenth, each scaled by rating / 10.
pub fn banded_contribution(effective_weight: f64, rating: f64) -> f64 {
    let scaled = effective_weight * rating / 10.0;
    if rating >= EXCELLENT_RATING {
        scaled
    } else if rating >= GOOD_RATING {
        GOOD_FACTOR * scaled
    } else {
        POOR_FACTOR * scaled
    }
}

/// Scores offerings with a fixed unknown-element policy
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueScorer {
    policy: UnknownElementPolicy,
}

impl ValueScorer {
    pub fn new(policy: UnknownElementPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnknownElementPolicy {
        self.policy
    }

    /// Score an offering.
    ///
    /// Order of evaluation:
    /// 1. Ratings are range-checked and every catalog element the offering
    ///    names must have a weighted category (configuration error otherwise)
    /// 2. Table-stakes gate: any table-stakes element rated below 6 returns 0
    /// 3. Unknown elements are rejected or dropped per policy
    /// 4. Banded contributions are averaged per category
    /// 5. Category means are combined by category weight
    pub fn evaluate<E: ElementAccess + ?Sized>(
        &self,
        offering: &Offering,
        elements: &E,
        category_weights: &CategoryWeights,
        preferences: Option<&BuyerPreferences>,
    ) -> Result<ScoreOutcome> {
        for (name, &rating) in offering {
            if !rating.is_finite() || !(0.0..=10.0).contains(&rating) {
                return Err(SimError::InvalidRating {
                    element: name.clone(),
                    rating,
                });
            }
            if let Some(view) = elements.element(name) {
                if !category_weights.contains(view.category) {
                    return Err(SimError::MissingCategoryWeight {
                        category: view.category.to_string(),
                        element: name.clone(),
                    });
                }
            }
        }

        let mut detail = ScoreDetail {
            category_scores: category_weights
                .iter()
                .map(|(cat, _)| (cat.to_string(), 0.0))
                .collect(),
            ..Default::default()
        };

        // A single failed must-have voids the offer
        for (name, &rating) in offering {
            if let Some(view) = elements.element(name) {
                if view.is_table_stakes() && rating < TABLE_STAKES_MIN_RATING {
                    detail.table_stakes_failed = Some(name.clone());
                    return Ok(ScoreOutcome { score: 0.0, detail });
                }
            }
        }

        let mut sums: BTreeMap<&str, (f64, u32)> = BTreeMap::new();
        for (name, &rating) in offering {
            let Some(view) = elements.element(name) else {
                match self.policy {
                    UnknownElementPolicy::Reject => {
                        return Err(SimError::UnknownElement(name.clone()));
                    }
                    UnknownElementPolicy::DropWithWarning => {
                        warn!(element = %name, "offering element not in catalog; dropped");
                        detail.dropped.push(name.clone());
                        continue;
                    }
                }
            };

            let multiplier = preferences
                .and_then(|p| p.get(name))
                .copied()
                .unwrap_or(1.0);
            let contribution = banded_contribution(view.weight * multiplier, rating);

            detail.contributions.insert(name.clone(), contribution);
            let slot = sums.entry(view.category).or_insert((0.0, 0));
            slot.0 += contribution;
            slot.1 += 1;
        }

        let mut score = 0.0;
        for (category, weight) in category_weights.iter() {
            let mean = match sums.get(category) {
                Some(&(sum, count)) if count > 0 => sum / count as f64,
                _ => 0.0,
            };
            detail.category_scores.insert(category.to_string(), mean);
            score += mean * weight;
        }

        Ok(ScoreOutcome { score, detail })
    }
}
