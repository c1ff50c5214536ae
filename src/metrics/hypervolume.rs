//! Exact hypervolume indicator (minimization)
//!
//! Hypervolume by Slicing Objectives (HSO): the point set is sorted along the
//! last objective and cut into slabs; each slab's volume is the depth times
//! the (d-1)-dimensional hypervolume of the points below it. Two objectives
//! use a direct sweep.
//!
//! References:
//! - While et al. (2006): A faster algorithm for calculating hypervolume

use super::pareto::pareto_mask;

/// Hypervolume calculator bound to a reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypervolume {
    ref_point: Vec<f64>,
}

impl Hypervolume {
    /// Create a calculator for the given reference point (one value per objective).
    #[must_use]
    pub fn new(ref_point: Vec<f64>) -> Self {
        Self { ref_point }
    }

    /// Get the reference point.
    #[must_use]
    pub fn ref_point(&self) -> &[f64] {
        &self.ref_point
    }

    /// Compute the hypervolume dominated by `points`.
    ///
    /// Only points strictly better than the reference point in every
    /// objective contribute. Points of the wrong dimension or holding NaN are
    /// ignored. An empty set has hypervolume 0.
    #[must_use]
    pub fn compute(&self, points: &[Vec<f64>]) -> f64 {
        let dims = self.ref_point.len();
        let inside: Vec<Vec<f64>> = points
            .iter()
            .filter(|p| p.len() == dims && p.iter().zip(&self.ref_point).all(|(v, r)| v < r))
            .cloned()
            .collect();

        volume(inside, &self.ref_point)
    }
}

fn volume(points: Vec<Vec<f64>>, ref_point: &[f64]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }

    let mask = pareto_mask(&points);
    let mut front: Vec<Vec<f64>> = points
        .into_iter()
        .zip(mask)
        .filter_map(|(p, keep)| keep.then_some(p))
        .collect();

    match ref_point.len() {
        0 => 0.0,
        1 => {
            let best = front.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
            ref_point[0] - best
        }
        2 => {
            front.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
            let mut area = 0.0;
            let mut ceiling = ref_point[1];
            for p in &front {
                if p[1] < ceiling {
                    area += (ref_point[0] - p[0]) * (ceiling - p[1]);
                    ceiling = p[1];
                }
            }
            area
        }
        dims => {
            let last = dims - 1;
            front.sort_by(|a, b| a[last].total_cmp(&b[last]));

            let mut total = 0.0;
            for i in 0..front.len() {
                let upper = front.get(i + 1).map_or(ref_point[last], |next| next[last]);
                let depth = upper - front[i][last];
                if depth <= 0.0 {
                    continue;
                }
                let slab: Vec<Vec<f64>> = front[..=i].iter().map(|p| p[..last].to_vec()).collect();
                total += volume(slab, &ref_point[..last]) * depth;
            }
            total
        }
    }
}
