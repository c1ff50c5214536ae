//! Prediction error between measured and predicted objectives

use crate::{Error, Result};

/// Mean absolute prediction error.
///
/// `sum_ij |actual_ij - predicted_ij| / (rows * n_obj)` over every objective
/// component of every row. Returns `Ok(None)` for zero rows: there is nothing
/// to compare against, and the caller stores the value as unset.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the two inputs differ in row
/// count or any row pair differs in length.
#[allow(clippy::cast_precision_loss)]
pub fn prediction_error(actual: &[Vec<f64>], predicted: &[Vec<f64>]) -> Result<Option<f64>> {
    if actual.len() != predicted.len() {
        return Err(Error::DimensionMismatch(format!(
            "{} measured rows vs {} predicted rows",
            actual.len(),
            predicted.len()
        )));
    }

    let mut total = 0.0;
    let mut count = 0usize;
    for (i, (a, p)) in actual.iter().zip(predicted).enumerate() {
        if a.len() != p.len() {
            return Err(Error::DimensionMismatch(format!(
                "row {i}: {} measured objectives vs {} predicted",
                a.len(),
                p.len()
            )));
        }
        total += a.iter().zip(p).map(|(x, y)| (x - y).abs()).sum::<f64>();
        count += a.len();
    }

    if count == 0 {
        return Ok(None);
    }

    Ok(Some(total / count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_error_exact_is_zero() {
        let y = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(prediction_error(&y, &y).unwrap(), Some(0.0));
    }

    #[test]
    fn test_prediction_error_mean_absolute() {
        let actual = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let predicted = vec![vec![2.0, 2.0], vec![3.0, 1.0]];
        // (1 + 0 + 0 + 3) / 4
        assert_eq!(prediction_error(&actual, &predicted).unwrap(), Some(1.0));
    }

    #[test]
    fn test_prediction_error_empty_is_none() {
        assert_eq!(prediction_error(&[], &[]).unwrap(), None);
    }

    #[test]
    fn test_prediction_error_row_mismatch() {
        let result = prediction_error(&[vec![1.0]], &[]);
        assert!(matches!(result, Err(Error::DimensionMismatch(_))));
    }

    #[test]
    fn test_prediction_error_column_mismatch() {
        let result = prediction_error(&[vec![1.0, 2.0]], &[vec![1.0]]);
        assert!(matches!(result, Err(Error::DimensionMismatch(_))));
    }

    #[test]
    fn test_prediction_error_grows_with_deviation() {
        let actual = vec![vec![0.0, 0.0]];
        let small = prediction_error(&actual, &[vec![0.5, 0.0]]).unwrap().unwrap();
        let large = prediction_error(&actual, &[vec![1.5, 0.0]]).unwrap().unwrap();
        assert!(large > small);
    }
}
