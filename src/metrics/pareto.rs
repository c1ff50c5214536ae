//! Pareto dominance filtering (minimization)

/// Returns `true` if `a` dominates `b`.
///
/// `a` dominates `b` when it is no worse in every objective and strictly
/// better in at least one. Identical points do not dominate each other.
#[must_use]
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    let at_least_as_good = a.iter().zip(b).all(|(x, y)| x <= y);
    let strictly_better = a.iter().zip(b).any(|(x, y)| x < y);
    at_least_as_good && strictly_better
}

/// Marks every point that no other point dominates.
///
/// Duplicated points stay Pareto-optimal together. Empty input yields an
/// empty mask.
///
/// Time complexity: O(N² · M) for N points with M objectives.
#[must_use]
pub fn pareto_mask(points: &[Vec<f64>]) -> Vec<bool> {
    let n = points.len();
    let mut mask = vec![true; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if !mask[i] && !mask[j] {
                continue;
            }
            if dominates(&points[i], &points[j]) {
                mask[j] = false;
            } else if dominates(&points[j], &points[i]) {
                mask[i] = false;
            }
        }
    }

    mask
}
