//! Problem descriptor - the slice of a problem definition the agent needs

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Dimensions and hypervolume reference point of an optimization problem.
///
/// Deserializable from JSON (or any serde format):
///
/// ```rust
/// use mobo_db::problem::ProblemDescriptor;
///
/// let problem: ProblemDescriptor =
///     serde_json::from_str(r#"{"n_var": 3, "n_obj": 2, "ref_point": [11.0, 11.0]}"#).unwrap();
/// assert_eq!(problem.ref_point(), vec![11.0, 11.0]);
///
/// // Reference point defaults to the origin
/// let problem = ProblemDescriptor::new(3, 2);
/// assert_eq!(problem.ref_point(), vec![0.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDescriptor {
    n_var: usize,
    n_obj: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ref_point: Option<Vec<f64>>,
}

impl ProblemDescriptor {
    /// Create a descriptor with the default (all-zeros) reference point.
    #[must_use]
    pub const fn new(n_var: usize, n_obj: usize) -> Self {
        Self {
            n_var,
            n_obj,
            ref_point: None,
        }
    }

    /// Set the hypervolume reference point.
    #[must_use]
    pub fn with_ref_point(mut self, ref_point: Vec<f64>) -> Self {
        self.ref_point = Some(ref_point);
        self
    }

    /// Number of design variables.
    #[must_use]
    pub const fn n_var(&self) -> usize {
        self.n_var
    }

    /// Number of objectives.
    #[must_use]
    pub const fn n_obj(&self) -> usize {
        self.n_obj
    }

    /// Hypervolume reference point (all zeros when not set).
    #[must_use]
    pub fn ref_point(&self) -> Vec<f64> {
        self.ref_point
            .clone()
            .unwrap_or_else(|| vec![0.0; self.n_obj])
    }

    /// Check dimensions and reference point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for zero dimensions or a non-finite
    /// reference point, and [`Error::DimensionMismatch`] if the reference
    /// point length differs from `n_obj`.
    pub fn validate(&self) -> Result<()> {
        if self.n_var == 0 {
            return Err(Error::InvalidInput("n_var must be positive".to_string()));
        }
        if self.n_obj == 0 {
            return Err(Error::InvalidInput("n_obj must be positive".to_string()));
        }
        if let Some(ref_point) = &self.ref_point {
            if ref_point.len() != self.n_obj {
                return Err(Error::DimensionMismatch(format!(
                    "reference point has {} components, problem has {} objectives",
                    ref_point.len(),
                    self.n_obj
                )));
            }
            if ref_point.iter().any(|v| !v.is_finite()) {
                return Err(Error::InvalidInput(
                    "reference point must be finite".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ref_point() {
        let problem = ProblemDescriptor::new(2, 3);
        assert_eq!(problem.ref_point(), vec![0.0; 3]);
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_dimensions() {
        assert!(ProblemDescriptor::new(0, 2).validate().is_err());
        assert!(ProblemDescriptor::new(2, 0).validate().is_err());
    }

    #[test]
    fn test_validate_ref_point_length() {
        let problem = ProblemDescriptor::new(2, 2).with_ref_point(vec![1.0]);
        assert!(matches!(problem.validate(), Err(Error::DimensionMismatch(_))));
    }

    #[test]
    fn test_validate_ref_point_finite() {
        let problem = ProblemDescriptor::new(2, 2).with_ref_point(vec![1.0, f64::INFINITY]);
        assert!(matches!(problem.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_serde_roundtrip_omits_missing_ref_point() {
        let problem = ProblemDescriptor::new(4, 2);
        let json = serde_json::to_string(&problem).unwrap();
        assert_eq!(json, r#"{"n_var":4,"n_obj":2}"#);
        let back: ProblemDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, problem);
    }
}
