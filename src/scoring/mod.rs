//! Value-proposition scoring

pub mod value_scorer;

pub use value_scorer::{
    banded_contribution, BuyerPreferences, Offering, ScoreDetail, ScoreOutcome,
    UnknownElementPolicy, ValueScorer, TABLE_STAKES_MIN_RATING,
};
