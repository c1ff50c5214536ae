//! Integration tests for the transactional store contract

use arrow::array::{Array, BooleanArray, Float64Array, Int64Array};
use mobo_db::schema::{ColumnSpec, ColumnType};
use mobo_db::store::{MemoryStore, RowTarget, SampleStore, Transaction, Value};
use mobo_db::Error;

fn names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(ToString::to_string).collect()
}

fn store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .write(|txn| {
            txn.create_table(
                "samples",
                &[
                    ColumnSpec::new("f1", ColumnType::Real),
                    ColumnSpec::new("is_pareto", ColumnType::Boolean),
                    ColumnSpec::new("batch_id", ColumnType::Integer),
                ],
            )
        })
        .unwrap();
    store
}

#[test]
fn test_insert_leaves_missing_columns_unset() {
    let store = store();
    store
        .write(|txn| txn.insert("samples", &names(&["batch_id"]), &[vec![Value::integer(1)]]))
        .unwrap();

    let batch = store
        .read(|txn| txn.select("samples", &names(&["f1", "is_pareto", "batch_id"])))
        .unwrap();
    assert_eq!(batch.num_rows(), 1);

    let f1 = batch.column(0).as_any().downcast_ref::<Float64Array>().unwrap();
    assert!(f1.is_null(0));
    let pareto = batch.column(1).as_any().downcast_ref::<BooleanArray>().unwrap();
    assert!(!pareto.value(0));
    let batch_id = batch.column(2).as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(batch_id.value(0), 1);
}

#[test]
fn test_row_ids_are_gapless() {
    let store = store();
    let columns = names(&["f1"]);
    for (n, expected) in [(2, 2), (3, 5), (1, 6)] {
        let last = store
            .write(|txn| {
                txn.insert("samples", &columns, &vec![vec![Value::real(1.0)]; n])?;
                txn.last_inserted_id("samples")
            })
            .unwrap();
        assert_eq!(last, expected);
    }
}

#[test]
fn test_update_all_and_ids() {
    let store = store();
    let columns = names(&["f1", "is_pareto"]);
    store
        .write(|txn| {
            txn.insert(
                "samples",
                &columns,
                &vec![vec![Value::real(1.0), Value::Boolean(true)]; 4],
            )
        })
        .unwrap();

    let flag = names(&["is_pareto"]);
    store
        .write(|txn| {
            txn.update("samples", &flag, &[Value::Boolean(false)], &RowTarget::All)?;
            txn.update("samples", &flag, &[Value::Boolean(true)], &RowTarget::Ids(vec![2, 4]))
        })
        .unwrap();

    let batch = store.read(|txn| txn.select("samples", &flag)).unwrap();
    let pareto = batch.column(0).as_any().downcast_ref::<BooleanArray>().unwrap();
    let values: Vec<bool> = (0..pareto.len()).map(|i| pareto.value(i)).collect();
    assert_eq!(values, vec![false, true, false, true]);
}

#[test]
fn test_update_out_of_range_rolls_back() {
    let store = store();
    let columns = names(&["f1"]);
    store
        .write(|txn| txn.insert("samples", &columns, &[vec![Value::real(1.0)]]))
        .unwrap();
    let before = store.snapshot().unwrap();

    let err = store
        .write(|txn| {
            txn.update("samples", &columns, &[Value::real(9.0)], &RowTarget::one(1))?;
            txn.update("samples", &columns, &[Value::real(9.0)], &RowTarget::one(2))
        })
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidRowId {
            row_id: 2,
            max_row_id: 1
        }
    ));
    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn test_type_and_column_errors() {
    let store = store();
    let err = store
        .write(|txn| txn.insert("samples", &names(&["f1"]), &[vec![Value::Boolean(true)]]))
        .unwrap_err();
    assert!(matches!(err, Error::StorageError(_)));

    let err = store
        .read(|txn| txn.select("samples", &names(&["f9"])))
        .unwrap_err();
    assert!(matches!(err, Error::StorageError(_)));

    let err = store
        .read(|txn| txn.row_count("missing"))
        .unwrap_err();
    assert!(matches!(err, Error::StorageError(_)));
}

#[test]
fn test_create_table_twice_fails() {
    let store = store();
    let err = store
        .write(|txn| txn.create_table("samples", &[ColumnSpec::new("a", ColumnType::Real)]))
        .unwrap_err();
    assert!(matches!(err, Error::SchemaError(_)));
    assert_eq!(store.snapshot().unwrap().table_names(), vec!["samples".to_string()]);
}

#[test]
fn test_table_spec_roundtrip() {
    let store = store();
    let spec = store.read(|txn| Ok(txn.table_spec("samples"))).unwrap().unwrap();
    assert_eq!(spec.len(), 3);
    assert_eq!(spec[1], ColumnSpec::new("is_pareto", ColumnType::Boolean));
    assert!(store.read(|txn| Ok(txn.table_spec("missing"))).unwrap().is_none());
}

#[test]
fn test_select_empty_table() {
    let store = store();
    let batch = store
        .read(|txn| txn.select("samples", &names(&["f1", "batch_id"])))
        .unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 2);
}
