//! Pareto and metric utilities
//!
//! Pure functions over objective vectors. All objectives are minimized.
//!
//! - [`pareto`]: dominance test and non-dominated mask
//! - [`hypervolume`]: exact hypervolume indicator against a reference point
//! - [`prediction`]: aggregate error between measured and predicted objectives
//!
//! ## Example
//!
//! ```rust
//! use mobo_db::metrics::{pareto_mask, Hypervolume};
//!
//! let points = vec![vec![1.0, 3.0], vec![2.0, 2.0], vec![3.0, 3.0]];
//! assert_eq!(pareto_mask(&points), vec![true, true, false]);
//!
//! let hv = Hypervolume::new(vec![4.0, 4.0]);
//! assert!((hv.compute(&points) - 5.0).abs() < 1e-12);
//! ```

pub mod hypervolume;
pub mod pareto;
pub mod prediction;

pub use hypervolume::Hypervolume;
pub use pareto::{dominates, pareto_mask};
pub use prediction::prediction_error;
