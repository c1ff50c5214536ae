//! Query results

use std::ops::Range;
use std::sync::Arc;

use arrow::array::{Array, BooleanArray, Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;

use crate::schema::{ColumnType, Field, Layout};
use crate::store::RowId;
use crate::{Error, Result};

/// Projection of the sample table over a set of [`Field`]s.
///
/// Wraps the Arrow [`RecordBatch`] returned by the store together with the
/// row ids of the rows it kept. Unset values are Arrow nulls.
#[derive(Debug, Clone)]
pub struct Selection {
    layout: Arc<Layout>,
    fields: Vec<Field>,
    batch: RecordBatch,
    row_ids: Vec<RowId>,
}

impl Selection {
    pub(crate) fn new(
        layout: Arc<Layout>,
        fields: Vec<Field>,
        batch: RecordBatch,
        row_ids: Vec<RowId>,
    ) -> Self {
        Self {
            layout,
            fields,
            batch,
            row_ids,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Check if no rows were selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Row ids of the selected rows, in row order.
    #[must_use]
    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    /// Fields in request order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Underlying record batch (physical columns in request order).
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Consume the selection, returning the record batch.
    #[must_use]
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    /// Real-valued field as rows of optional values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the field was not selected or is
    /// not real-valued.
    pub fn optional_matrix(&self, field: Field) -> Result<Vec<Vec<Option<f64>>>> {
        let range = self.column_range(field, ColumnType::Real)?;
        optional_rows(&self.batch, range)
    }

    /// Real-valued field as a dense matrix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsetValue`] if any selected value is unset, and the
    /// errors of [`optional_matrix`](Self::optional_matrix).
    pub fn matrix(&self, field: Field) -> Result<Vec<Vec<f64>>> {
        let columns = self.layout.columns(field);
        self.optional_matrix(field)?
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(columns)
                    .map(|(v, name)| v.ok_or_else(|| Error::UnsetValue(name.clone())))
                    .collect::<Result<Vec<f64>>>()
            })
            .collect()
    }

    /// Single-column real field (`hv`, `pred_error`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the field was not selected or is
    /// not a single real column.
    pub fn reals(&self, field: Field) -> Result<Vec<Option<f64>>> {
        let column = self.single_column(field, ColumnType::Real)?;
        Ok(downcast::<Float64Array>(self.batch.column(column).as_ref(), field)?
            .iter()
            .collect())
    }

    /// Single-column integer field (`config_id`, `batch_id`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the field was not selected or is
    /// not an integer column.
    pub fn integers(&self, field: Field) -> Result<Vec<Option<i64>>> {
        let column = self.single_column(field, ColumnType::Integer)?;
        Ok(downcast::<Int64Array>(self.batch.column(column).as_ref(), field)?
            .iter()
            .collect())
    }

    /// Boolean field (`is_pareto`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the field was not selected or is
    /// not a boolean column.
    pub fn bools(&self, field: Field) -> Result<Vec<bool>> {
        let column = self.single_column(field, ColumnType::Boolean)?;
        Ok(downcast::<BooleanArray>(self.batch.column(column).as_ref(), field)?
            .iter()
            .map(|b| b.unwrap_or(false))
            .collect())
    }

    fn column_range(&self, field: Field, expected: ColumnType) -> Result<Range<usize>> {
        if field.column_type() != expected {
            return Err(Error::InvalidInput(format!(
                "field '{field}' holds {:?} values, not {expected:?}",
                field.column_type()
            )));
        }

        let mut start = 0;
        for &selected in &self.fields {
            let width = self.layout.columns(selected).len();
            if selected == field {
                return Ok(start..start + width);
            }
            start += width;
        }
        Err(Error::InvalidInput(format!("field '{field}' was not selected")))
    }

    fn single_column(&self, field: Field, expected: ColumnType) -> Result<usize> {
        let range = self.column_range(field, expected)?;
        if range.len() != 1 {
            return Err(Error::InvalidInput(format!(
                "field '{field}' spans {} columns; use the matrix accessors",
                range.len()
            )));
        }
        Ok(range.start)
    }
}

fn downcast<T: Array + 'static>(array: &dyn Array, field: Field) -> Result<&T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Other(format!("Failed to downcast column of field '{field}'")))
}

/// Read a contiguous range of `Float64` columns as rows of optional values.
pub(crate) fn optional_rows(batch: &RecordBatch, columns: Range<usize>) -> Result<Vec<Vec<Option<f64>>>> {
    let arrays = columns
        .map(|i| {
            batch
                .column(i)
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| Error::Other(format!("Column {i} is not Float64")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((0..batch.num_rows())
        .map(|row| {
            arrays
                .iter()
                .map(|a| a.is_valid(row).then(|| a.value(row)))
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Layout;
    use arrow::array::ArrayRef;

    fn selection() -> Selection {
        let layout = Arc::new(Layout::new(1, 2));
        let fields = vec![Field::Y, Field::Hv, Field::IsPareto, Field::BatchId];
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Float64Array::from(vec![Some(1.0), None])),
            Arc::new(Float64Array::from(vec![Some(2.0), None])),
            Arc::new(Float64Array::from(vec![Some(0.5), None])),
            Arc::new(BooleanArray::from(vec![true, false])),
            Arc::new(Int64Array::from(vec![Some(0), Some(1)])),
        ];
        let batch = RecordBatch::try_new(layout.arrow_schema(&fields), columns).unwrap();
        Selection::new(layout, fields, batch, vec![1, 2])
    }

    #[test]
    fn test_optional_matrix() {
        let sel = selection();
        assert_eq!(
            sel.optional_matrix(Field::Y).unwrap(),
            vec![vec![Some(1.0), Some(2.0)], vec![None, None]]
        );
    }

    #[test]
    fn test_matrix_rejects_unset() {
        let err = selection().matrix(Field::Y).unwrap_err();
        assert!(matches!(err, Error::UnsetValue(ref c) if c == "f1"));
    }

    #[test]
    fn test_scalar_accessors() {
        let sel = selection();
        assert_eq!(sel.reals(Field::Hv).unwrap(), vec![Some(0.5), None]);
        assert_eq!(sel.bools(Field::IsPareto).unwrap(), vec![true, false]);
        assert_eq!(sel.integers(Field::BatchId).unwrap(), vec![Some(0), Some(1)]);
        assert_eq!(sel.row_ids(), &[1, 2]);
    }

    #[test]
    fn test_accessor_type_and_presence_checks() {
        let sel = selection();
        assert!(sel.reals(Field::IsPareto).is_err());
        assert!(sel.optional_matrix(Field::X).is_err());
        assert!(sel.reals(Field::Y).is_err());
    }
}
