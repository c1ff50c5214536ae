//! Error types for mobo-db
//!
//! Every error surfaces synchronously from the failing call. A failed
//! mutating call leaves no partial write behind, so callers may retry it in
//! full.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// mobo-db error types
#[derive(Error, Debug)]
pub enum Error {
    /// Existing table schema is incompatible with the requested one
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Row id outside the currently assigned range
    #[error("Invalid row id {row_id}: valid row ids are 1..={max_row_id}")]
    InvalidRowId {
        /// Offending row id
        row_id: u64,
        /// Last row id assigned by the store
        max_row_id: u64,
    },

    /// Input shapes disagree with `n_var`/`n_obj` or with each other
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// `seed` called on a table that already holds the initial samples
    #[error("Database already seeded with {0} initial samples")]
    AlreadySeeded(usize),

    /// `propose`/`record` called before `seed`
    #[error("Database not seeded: call seed() with the initial samples first")]
    NotSeeded,

    /// Same row id supplied twice in one `record` call
    #[error("Duplicate row id {0} in a single record call")]
    DuplicateRowId(u64),

    /// Invalid argument value (non-finite number, empty field list, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Typed accessor hit an unset value
    #[error("Unset value in column '{0}'\nQuery with valid_only = true or use the optional accessor")]
    UnsetValue(String),

    /// Storage error (missing table, unknown column, type mismatch)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Store already released by `close()`
    #[error("Store is closed")]
    StoreClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
