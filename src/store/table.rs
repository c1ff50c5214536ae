//! In-memory tables and the transaction operations over them

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{RowId, RowTarget, Transaction, Value};
use crate::schema::{ColumnSpec, ColumnType};
use crate::{Error, Result};

/// Column storage; `None` marks an unset value.
#[derive(Debug, Clone, PartialEq)]
enum ColumnData {
    Real(Vec<Option<f64>>),
    Boolean(Vec<bool>),
    Integer(Vec<Option<i64>>),
}

impl ColumnData {
    fn empty(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Real => Self::Real(Vec::new()),
            ColumnType::Boolean => Self::Boolean(Vec::new()),
            ColumnType::Integer => Self::Integer(Vec::new()),
        }
    }

    fn push_default(&mut self) {
        match self {
            Self::Real(v) => v.push(None),
            Self::Boolean(v) => v.push(false),
            Self::Integer(v) => v.push(None),
        }
    }

    /// Write `value` at `index`; the index must already exist.
    fn set(&mut self, index: usize, value: Value) {
        match (self, value) {
            (Self::Real(v), Value::Real(x)) => v[index] = x,
            (Self::Boolean(v), Value::Boolean(x)) => v[index] = x,
            (Self::Integer(v), Value::Integer(x)) => v[index] = x,
            // Types are checked before any write
            _ => {}
        }
    }

    fn to_array(&self) -> ArrayRef {
        match self {
            Self::Real(v) => Arc::new(Float64Array::from(v.clone())),
            Self::Boolean(v) => Arc::new(BooleanArray::from(v.clone())),
            Self::Integer(v) => Arc::new(Int64Array::from(v.clone())),
        }
    }

    fn extend_from_array(&mut self, array: &dyn Array, column: &str) -> Result<()> {
        let mismatch = || Error::StorageError(format!("column '{column}' has unexpected Arrow type"));
        match self {
            Self::Real(v) => {
                let array = array.as_any().downcast_ref::<Float64Array>().ok_or_else(mismatch)?;
                v.extend(array.iter());
            }
            Self::Boolean(v) => {
                let array = array.as_any().downcast_ref::<BooleanArray>().ok_or_else(mismatch)?;
                v.extend(array.iter().map(|b| b.unwrap_or(false)));
            }
            Self::Integer(v) => {
                let array = array.as_any().downcast_ref::<Int64Array>().ok_or_else(mismatch)?;
                v.extend(array.iter());
            }
        }
        Ok(())
    }
}

/// One table: column specs plus column-major data.
#[derive(Debug, Clone, PartialEq)]
struct Table {
    specs: Vec<ColumnSpec>,
    index: FxHashMap<String, usize>,
    data: Vec<ColumnData>,
    rows: usize,
}

impl Table {
    fn new(name: &str, specs: &[ColumnSpec]) -> Result<Self> {
        let mut index = FxHashMap::default();
        for (i, spec) in specs.iter().enumerate() {
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(Error::SchemaError(format!(
                    "duplicate column '{}' in table '{name}'",
                    spec.name
                )));
            }
        }

        Ok(Self {
            specs: specs.to_vec(),
            index,
            data: specs.iter().map(|s| ColumnData::empty(s.column_type)).collect(),
            rows: 0,
        })
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.index
            .get(column)
            .copied()
            .ok_or_else(|| Error::StorageError(format!("unknown column '{column}'")))
    }

    /// Resolve columns and check that `values` line up with them by type.
    fn resolve(&self, columns: &[String], values: &[Value]) -> Result<Vec<usize>> {
        if columns.len() != values.len() {
            return Err(Error::DimensionMismatch(format!(
                "{} values for {} columns",
                values.len(),
                columns.len()
            )));
        }

        columns
            .iter()
            .zip(values)
            .map(|(column, value)| {
                let i = self.column_index(column)?;
                let expected = self.specs[i].column_type;
                if value.column_type() != expected {
                    return Err(Error::StorageError(format!(
                        "column '{column}' expects {expected:?}, got {:?}",
                        value.column_type()
                    )));
                }
                Ok(i)
            })
            .collect()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn check_row_id(&self, row_id: RowId) -> Result<usize> {
        let max_row_id = self.rows as RowId;
        if row_id == 0 || row_id > max_row_id {
            return Err(Error::InvalidRowId { row_id, max_row_id });
        }
        Ok((row_id - 1) as usize)
    }

    fn schema(&self, indices: &[usize]) -> SchemaRef {
        Arc::new(Schema::new(
            indices
                .iter()
                .map(|&i| self.specs[i].arrow_field())
                .collect::<Vec<_>>(),
        ))
    }
}

/// A set of named tables; the unit a transaction stages and commits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    tables: FxHashMap<String, Table>,
}

impl Database {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all tables, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::StorageError(format!("unknown table '{name}'")))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::StorageError(format!("unknown table '{name}'")))
    }

    /// Create a table from Arrow record batches, typing columns by their Arrow schema.
    pub(crate) fn create_table_from_batches(
        &mut self,
        name: &str,
        schema: &Schema,
        batches: &[RecordBatch],
    ) -> Result<()> {
        let specs = schema
            .fields()
            .iter()
            .map(|f| Ok(ColumnSpec::new(f.name().clone(), ColumnType::from_data_type(f.data_type())?)))
            .collect::<Result<Vec<_>>>()?;
        self.create_table(name, &specs)?;

        let table = self.table_mut(name)?;
        for batch in batches {
            if batch.num_columns() != table.specs.len() {
                return Err(Error::SchemaError(format!(
                    "batch has {} columns, table '{name}' has {}",
                    batch.num_columns(),
                    table.specs.len()
                )));
            }
            for (data, (spec, array)) in table
                .data
                .iter_mut()
                .zip(table.specs.iter().zip(batch.columns()))
            {
                data.extend_from_array(array.as_ref(), &spec.name)?;
            }
            table.rows += batch.num_rows();
        }
        Ok(())
    }
}

impl Transaction for Database {
    fn create_table(&mut self, name: &str, columns: &[ColumnSpec]) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(Error::SchemaError(format!("table '{name}' already exists")));
        }
        let table = Table::new(name, columns)?;
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    fn table_spec(&self, name: &str) -> Option<Vec<ColumnSpec>> {
        self.tables.get(name).map(|t| t.specs.clone())
    }

    fn insert(&mut self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<()> {
        let table = self.table_mut(table)?;

        // Validate every row before touching the data
        let mut indices = Vec::new();
        for row in rows {
            indices = table.resolve(columns, row)?;
        }

        for row in rows {
            let at = table.rows;
            for data in &mut table.data {
                data.push_default();
            }
            for (&i, &value) in indices.iter().zip(row) {
                table.data[i].set(at, value);
            }
            table.rows += 1;
        }
        Ok(())
    }

    fn update(
        &mut self,
        table: &str,
        columns: &[String],
        values: &[Value],
        target: &RowTarget,
    ) -> Result<()> {
        let table = self.table_mut(table)?;
        let indices = table.resolve(columns, values)?;

        let rows: Vec<usize> = match target {
            RowTarget::All => (0..table.rows).collect(),
            RowTarget::Ids(ids) => ids
                .iter()
                .map(|&id| table.check_row_id(id))
                .collect::<Result<_>>()?,
        };

        for row in rows {
            for (&i, &value) in indices.iter().zip(values) {
                table.data[i].set(row, value);
            }
        }
        Ok(())
    }

    fn select(&self, table: &str, columns: &[String]) -> Result<RecordBatch> {
        let table = self.table(table)?;
        let indices = columns
            .iter()
            .map(|c| table.column_index(c))
            .collect::<Result<Vec<_>>>()?;

        let arrays: Vec<ArrayRef> = indices.iter().map(|&i| table.data[i].to_array()).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(table.rows));
        Ok(RecordBatch::try_new_with_options(
            table.schema(&indices),
            arrays,
            &options,
        )?)
    }

    fn last_inserted_id(&self, table: &str) -> Result<RowId> {
        Ok(self.table(table)?.rows as RowId)
    }

    fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.table(table)?.rows)
    }
}

/// Reject repeated ids; returns the first duplicate found.
pub(crate) fn first_duplicate(ids: &[RowId]) -> Option<RowId> {
    let mut seen = FxHashSet::default();
    ids.iter().copied().find(|id| !seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(ToString::to_string).collect()
    }

    fn test_db() -> Database {
        let mut db = Database::new();
        db.create_table(
            "data",
            &[
                ColumnSpec::new("a", ColumnType::Real),
                ColumnSpec::new("flag", ColumnType::Boolean),
                ColumnSpec::new("n", ColumnType::Integer),
            ],
        )
        .unwrap();
        db
    }

    #[test]
    fn test_insert_defaults_unlisted_columns() {
        let mut db = test_db();
        db.insert("data", &names(&["a"]), &[vec![Value::real(1.0)]]).unwrap();

        let batch = db.select("data", &names(&["a", "flag", "n"])).unwrap();
        let flag = batch.column(1).as_any().downcast_ref::<BooleanArray>().unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert!(!flag.value(0));
        assert!(batch.column(2).is_null(0));
    }

    #[test]
    fn test_last_inserted_id_is_gapless() {
        let mut db = test_db();
        assert_eq!(db.last_inserted_id("data").unwrap(), 0);
        let rows = vec![vec![Value::real(1.0)], vec![Value::real(2.0)]];
        db.insert("data", &names(&["a"]), &rows).unwrap();
        db.insert("data", &names(&["a"]), &rows[..1]).unwrap();
        assert_eq!(db.last_inserted_id("data").unwrap(), 3);
    }

    #[test]
    fn test_update_all_and_ids() {
        let mut db = test_db();
        let rows = vec![vec![Value::real(1.0)]; 3];
        db.insert("data", &names(&["a"]), &rows).unwrap();

        let flag = names(&["flag"]);
        db.update("data", &flag, &[Value::Boolean(true)], &RowTarget::All).unwrap();
        db.update("data", &flag, &[Value::Boolean(false)], &RowTarget::Ids(vec![1, 3]))
            .unwrap();

        let batch = db.select("data", &flag).unwrap();
        let flag = batch.column(0).as_any().downcast_ref::<BooleanArray>().unwrap();
        assert_eq!(flag.iter().collect::<Vec<_>>(), vec![Some(false), Some(true), Some(false)]);
    }

    #[test]
    fn test_update_out_of_range_row() {
        let mut db = test_db();
        db.insert("data", &names(&["a"]), &[vec![Value::real(1.0)]]).unwrap();

        let err = db
            .update("data", &names(&["a"]), &[Value::real(2.0)], &RowTarget::one(2))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRowId { row_id: 2, max_row_id: 1 }));

        let err = db
            .update("data", &names(&["a"]), &[Value::real(2.0)], &RowTarget::one(0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRowId { row_id: 0, .. }));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut db = test_db();
        let err = db
            .insert("data", &names(&["flag"]), &[vec![Value::real(1.0)]])
            .unwrap_err();
        assert!(err.to_string().contains("expects Boolean"));
        assert_eq!(db.row_count("data").unwrap(), 0);
    }

    #[test]
    fn test_unknown_table_and_column() {
        let db = test_db();
        assert!(db.select("missing", &[]).is_err());
        assert!(db.select("data", &names(&["zzz"])).is_err());
    }

    #[test]
    fn test_duplicate_table_and_column() {
        let mut db = test_db();
        assert!(matches!(db.create_table("data", &[]), Err(Error::SchemaError(_))));

        let dup = [
            ColumnSpec::new("a", ColumnType::Real),
            ColumnSpec::new("a", ColumnType::Integer),
        ];
        assert!(matches!(db.create_table("other", &dup), Err(Error::SchemaError(_))));
    }

    #[test]
    fn test_select_zero_columns_keeps_row_count() {
        let mut db = test_db();
        db.insert("data", &names(&["a"]), &vec![vec![Value::real(1.0)]; 4]).unwrap();
        assert_eq!(db.select("data", &[]).unwrap().num_rows(), 4);
    }

    #[test]
    fn test_first_duplicate() {
        assert_eq!(first_duplicate(&[1, 2, 3]), None);
        assert_eq!(first_duplicate(&[4, 2, 4, 2]), Some(4));
    }
}
