//! Weighted sampling over a probability row

use rand::Rng;

/// Draw `u` uniformly from `[0, 1)`
pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen::<f64>()
}

/// Pick an index by cumulative-sum search.
///
/// Returns the smallest index with positive probability whose cumulative
/// probability is `>= u`. If rounding leaves the total just short of `u`,
/// the last positive entry is taken. `None` when no entry is positive.
pub fn sample_index(probabilities: &[f64], u: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &p) in probabilities.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        cumulative += p;
        last_positive = Some(i);
        if cumulative >= u {
            return Some(i);
        }
    }
    last_positive
}
