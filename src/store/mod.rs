//! Row-oriented sample store
//!
//! The store contract the [`Agent`](crate::agent::Agent) is written against,
//! plus an in-memory implementation.
//!
//! ## Transactions
//!
//! Every access goes through a scoped transaction:
//!
//! - [`SampleStore::read`] runs its body under a shared lock. Readers run
//!   concurrently with each other and never observe a partially applied
//!   write.
//! - [`SampleStore::write`] runs its body under the exclusive lock. The body
//!   sees its own writes; returning `Ok` commits them, returning `Err` rolls
//!   all of them back.
//!
//! Multi-step read-modify-write sequences therefore live inside a single
//! `write` body instead of threading a lock object through call sites.
//!
//! ## Unset values
//!
//! `select` materializes columns as Arrow arrays. An unset numeric value is
//! an Arrow null (validity bitmap), never a NaN. Boolean columns are
//! non-nullable and default to `false`.
//!
//! ## Example
//!
//! ```rust
//! use mobo_db::schema::{ColumnSpec, ColumnType};
//! use mobo_db::store::{MemoryStore, RowTarget, SampleStore, Value};
//!
//! # fn main() -> mobo_db::Result<()> {
//! let store = MemoryStore::new();
//! let columns = vec!["score".to_string()];
//!
//! store.write(|txn| {
//!     txn.create_table("runs", &[ColumnSpec::new("score", ColumnType::Real)])?;
//!     txn.insert("runs", &columns, &[vec![Value::real(0.5)], vec![Value::unset()]])
//! })?;
//! store.write(|txn| txn.update("runs", &columns, &[Value::real(0.9)], &RowTarget::one(2)))?;
//!
//! let batch = store.read(|txn| txn.select("runs", &columns))?;
//! assert_eq!(batch.num_rows(), 2);
//! assert_eq!(batch.column(0).null_count(), 0);
//! # Ok(())
//! # }
//! ```

mod memory;
mod persist;
mod table;

pub use memory::MemoryStore;
pub use table::Database;
pub(crate) use table::first_duplicate;

use arrow::record_batch::RecordBatch;

use crate::schema::{ColumnSpec, ColumnType};
use crate::Result;

/// Store-assigned row identifier (1-indexed, gapless, insertion ordered).
pub type RowId = u64;

/// A single cell value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Real value; `None` is unset
    Real(Option<f64>),
    /// Boolean value
    Boolean(bool),
    /// Integer value; `None` is unset
    Integer(Option<i64>),
}

impl Value {
    /// Set real value.
    #[must_use]
    pub const fn real(value: f64) -> Self {
        Self::Real(Some(value))
    }

    /// Unset real value.
    #[must_use]
    pub const fn unset() -> Self {
        Self::Real(None)
    }

    /// Set integer value.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Integer(Some(value))
    }

    /// Column type this value belongs to.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        match self {
            Self::Real(_) => ColumnType::Real,
            Self::Boolean(_) => ColumnType::Boolean,
            Self::Integer(_) => ColumnType::Integer,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::real(value)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

/// Rows targeted by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTarget {
    /// Every row of the table
    All,
    /// The listed rows
    Ids(Vec<RowId>),
}

impl RowTarget {
    /// Target a single row.
    #[must_use]
    pub fn one(row_id: RowId) -> Self {
        Self::Ids(vec![row_id])
    }
}

/// Operations available inside a transaction.
///
/// Mutating methods take `&mut self` and are only reachable from
/// [`SampleStore::write`].
pub trait Transaction {
    /// Create a table with the given columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaError`](crate::Error::SchemaError) if the table
    /// already exists or the column names are not unique.
    fn create_table(&mut self, name: &str, columns: &[ColumnSpec]) -> Result<()>;

    /// Column specs of a table, `None` if the table does not exist.
    fn table_spec(&self, name: &str) -> Option<Vec<ColumnSpec>>;

    /// Append rows. Columns not listed are left unset (`false` for booleans).
    ///
    /// # Errors
    ///
    /// Returns an error if the table or a column is unknown, a row's length
    /// differs from `columns`, or a value's type differs from its column.
    fn insert(&mut self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<()>;

    /// Assign `values` (one per column) to every targeted row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRowId`](crate::Error::InvalidRowId) for a row
    /// id outside `1..=last_inserted_id`, and the same errors as
    /// [`insert`](Self::insert) for column problems.
    fn update(
        &mut self,
        table: &str,
        columns: &[String],
        values: &[Value],
        target: &RowTarget,
    ) -> Result<()>;

    /// Materialize the listed columns of every row, in row id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table or a column is unknown.
    fn select(&self, table: &str, columns: &[String]) -> Result<RecordBatch>;

    /// Identifier assigned to the most recently inserted row (0 if empty).
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown.
    fn last_inserted_id(&self, table: &str) -> Result<RowId>;

    /// Number of rows in the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown.
    fn row_count(&self, table: &str) -> Result<usize>;
}

/// Shared transactional store.
///
/// Implementations must be safe to call from many threads at once.
pub trait SampleStore: Send + Sync {
    /// Run `body` under the shared lock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`](crate::Error::StoreClosed) after
    /// `close`, or whatever `body` returns.
    fn read<T>(&self, body: impl FnOnce(&dyn Transaction) -> Result<T>) -> Result<T>;

    /// Run `body` under the exclusive lock; commit on `Ok`, roll back on `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`](crate::Error::StoreClosed) after
    /// `close`, or whatever `body` returns.
    fn write<T>(&self, body: impl FnOnce(&mut dyn Transaction) -> Result<T>) -> Result<T>;

    /// Release the store. Later transactions fail; closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Implementation-specific release failures.
    fn close(&self) -> Result<()>;
}
