//! In-memory transactional store.
//!
//! Data lives for the lifetime of the process; use
//! [`save_parquet`](MemoryStore::save_parquet) and
//! [`load_parquet`](MemoryStore::load_parquet) to carry a table across
//! restarts.

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::{Database, SampleStore, Transaction};
use crate::{Error, Result};

/// In-memory store guarded by a reader-writer lock.
///
/// Writers stage their changes on a copy of the database and swap it in on
/// commit, so a failed write leaves no trace. Lock acquisition blocks without
/// timeout; fairness is that of `parking_lot::RwLock` (eventually fair, no
/// FIFO guarantee).
///
/// # Example
///
/// ```rust
/// use mobo_db::schema::{ColumnSpec, ColumnType};
/// use mobo_db::store::{MemoryStore, SampleStore, Transaction};
///
/// # fn main() -> mobo_db::Result<()> {
/// let store = MemoryStore::new();
/// store.write(|txn| txn.create_table("t", &[ColumnSpec::new("a", ColumnType::Real)]))?;
/// assert_eq!(store.read(|txn| txn.row_count("t"))?, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<Option<Database>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::from_database(Database::new())
    }

    /// Create a store over existing tables.
    #[must_use]
    pub fn from_database(database: Database) -> Self {
        Self {
            state: RwLock::new(Some(database)),
        }
    }

    /// Check whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.read().is_none()
    }

    /// Copy of the committed state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] after `close`.
    pub fn snapshot(&self) -> Result<Database> {
        self.state.read().clone().ok_or(Error::StoreClosed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore for MemoryStore {
    fn read<T>(&self, body: impl FnOnce(&dyn Transaction) -> Result<T>) -> Result<T> {
        let guard = self.state.read();
        let database = guard.as_ref().ok_or(Error::StoreClosed)?;
        body(database)
    }

    fn write<T>(&self, body: impl FnOnce(&mut dyn Transaction) -> Result<T>) -> Result<T> {
        let mut guard = self.state.write();
        let committed = guard.as_mut().ok_or(Error::StoreClosed)?;

        let mut staged = committed.clone();
        match body(&mut staged) {
            Ok(value) => {
                *committed = staged;
                trace!("transaction committed");
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    fn close(&self) -> Result<()> {
        if self.state.write().take().is_some() {
            debug!("store closed");
        }
        Ok(())
    }
}
