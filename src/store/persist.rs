//! Parquet snapshots of store tables

use std::fs::File;
use std::path::Path;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use tracing::info;

use super::{Database, MemoryStore, SampleStore};
use crate::{Error, Result};

impl MemoryStore {
    /// Write every column of `table` to a Parquet file.
    ///
    /// Unset values are written as Parquet nulls; row ids are implicit in
    /// row order.
    ///
    /// # Errors
    ///
    /// Returns error if the table is unknown or the file cannot be written.
    pub fn save_parquet<P: AsRef<Path>>(&self, table: &str, path: P) -> Result<()> {
        let batch = self.read(|txn| {
            let spec = txn
                .table_spec(table)
                .ok_or_else(|| Error::StorageError(format!("unknown table '{table}'")))?;
            let columns: Vec<String> = spec.into_iter().map(|c| c.name).collect();
            txn.select(table, &columns)
        })?;

        let file = File::create(path.as_ref())?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;

        info!(table, rows = batch.num_rows(), path = %path.as_ref().display(), "table saved");
        Ok(())
    }

    /// Rebuild a store holding a single `table` from a Parquet file.
    ///
    /// Column types are taken from the file's Arrow schema (`Float64`,
    /// `Boolean`, `Int64`).
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or holds unsupported types.
    pub fn load_parquet<P: AsRef<Path>>(table: &str, path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to open Parquet file: {e}"))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let reader = builder.build()?;

        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

        let mut database = Database::new();
        database.create_table_from_batches(table, &schema, &batches)?;

        info!(table, batches = batches.len(), path = %path.as_ref().display(), "table loaded");
        Ok(Self::from_database(database))
    }
}
