//! Property tests for the matrix builder and the value scorer

use proptest::prelude::*;

use salescycle::catalog::{
    CategoryWeights, ElementCatalog, StateCatalog, TransitionMatrix, TransitionTable, ValueElement,
    TABLE_STAKES,
};
use salescycle::scoring::{Offering, ValueScorer};

fn catalog() -> ElementCatalog {
    ElementCatalog::new(vec![
        ValueElement::new("reliability", TABLE_STAKES, 0.9),
        ValueElement::new("speed", "performance", 0.5),
        ValueElement::new("scale", "performance", 0.3),
        ValueElement::new("support", "relationship", 0.4),
    ])
    .unwrap()
}

fn weights() -> CategoryWeights {
    [(TABLE_STAKES, 0.2), ("performance", 0.5), ("relationship", 0.3)]
        .into_iter()
        .collect()
}

#[test]
fn test_single_element_scenario() {
    let elements = ElementCatalog::new(vec![ValueElement::new("x", "perf", 0.5)]).unwrap();
    let weights: CategoryWeights = [("perf", 1.0)].into_iter().collect();
    let offering: Offering = [("x".to_string(), 9.0)].into_iter().collect();

    let outcome = ValueScorer::default()
        .evaluate(&offering, &elements, &weights, None)
        .unwrap();
    assert!((outcome.score - 0.45).abs() < 1e-12);
}

#[test]
fn test_table_stakes_gate_names_element() {
    let offering: Offering = [
        ("reliability".to_string(), 4.0),
        ("speed".to_string(), 10.0),
        ("support".to_string(), 10.0),
    ]
    .into_iter()
    .collect();

    let outcome = ValueScorer::default()
        .evaluate(&offering, &catalog(), &weights(), None)
        .unwrap();
    assert_eq!(outcome.score, 0.0);
    assert_eq!(outcome.detail.table_stakes_failed.as_deref(), Some("reliability"));
}

proptest! {
    #[test]
    fn prop_normalized_rows_sum_to_one(
        raw in prop::collection::vec(prop::collection::vec(0.01f64..1.0, 4), 4)
    ) {
        let names = ["S0", "S1", "S2", "S3"];
        let states = StateCatalog::from_names(&names).unwrap();
        let mut table = TransitionTable::new();
        for (from, row) in names.iter().zip(&raw) {
            let total: f64 = row.iter().sum();
            for (to, p) in names.iter().zip(row) {
                table.insert(*from, *to, p / total);
            }
        }
        let matrix = TransitionMatrix::build(&states, &table, 1e-6).unwrap();
        for i in 0..matrix.len() {
            prop_assert!((matrix.row_sum(i) - 1.0).abs() <= 1e-6);
        }
        prop_assert!(matrix.row_deviations(1e-6).is_empty());
    }

    #[test]
    fn prop_raising_rating_never_lowers_category_mean(
        speed in 0.0f64..=10.0,
        support in 0.0f64..=10.0,
    ) {
        let base: Offering = [
            ("reliability".to_string(), 9.0),
            ("speed".to_string(), speed),
            ("scale".to_string(), 5.0),
            ("support".to_string(), support),
        ]
        .into_iter()
        .collect();
        let mut raised = base.clone();
        raised.insert("scale".to_string(), 9.0);

        let scorer = ValueScorer::default();
        let before = scorer.evaluate(&base, &catalog(), &weights(), None).unwrap();
        let after = scorer.evaluate(&raised, &catalog(), &weights(), None).unwrap();

        prop_assert!(
            after.detail.category_scores["performance"] >= before.detail.category_scores["performance"]
        );
        prop_assert!(after.score >= before.score);
    }
}
