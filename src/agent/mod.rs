//! Agent - sample lifecycle over the store
//!
//! The agent owns the sample table for one experiment run and keeps its
//! derived columns consistent while an optimizer driver, evaluation workers
//! and the GUI call into it concurrently.
//!
//! ## Lifecycle
//!
//! ```text
//! initialize ──> seed(X, Y)                      batch 0, fully evaluated
//!                  │
//!                  ├──> propose(X, Ŷ, σ, config)  batch 1, 2, ... (Y unset)
//!                  │        │
//!                  │        └──> record(Y, rowids)  measured Y arrives
//!                  │
//!                  └──> query(fields, valid_only)   read-only, any time
//! ```
//!
//! ## Consistency
//!
//! - `seed`, `propose` and `record` each run as one store write transaction.
//!   `record` reads every row's `Y`/`Y_expected`, applies the new
//!   measurements in memory, recomputes hypervolume, prediction error and
//!   the Pareto flags over all valid rows, and writes back before
//!   committing. Concurrent `record` calls therefore serialize; neither can
//!   stamp a hypervolume that misses a committed write.
//! - Mutating calls also hold the agent's state lock (taken before the store
//!   lock) so the batch counter advances only after a committed insert.
//! - `query` runs under the store's shared lock and never observes a
//!   partially applied write.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mobo_db::agent::Agent;
//! use mobo_db::problem::ProblemDescriptor;
//! use mobo_db::schema::Field;
//! use mobo_db::store::MemoryStore;
//!
//! # fn main() -> mobo_db::Result<()> {
//! let problem = ProblemDescriptor::new(1, 2).with_ref_point(vec![10.0, 10.0]);
//! let agent = Agent::initialize(Arc::new(MemoryStore::new()), problem)?;
//!
//! agent.seed(&[vec![0.1], vec![0.9]], &[vec![2.0, 8.0], vec![8.0, 2.0]])?;
//! let rowids = agent.propose(&[vec![0.5]], &[vec![4.0, 4.0]], &[vec![0.1, 0.1]], 0)?;
//! assert_eq!(rowids, vec![3]);
//!
//! agent.record(&[vec![5.0, 5.0]], &rowids)?;
//! let pareto = agent.query(&[Field::IsPareto], true)?.bools(Field::IsPareto)?;
//! assert_eq!(pareto, vec![true, true, true]);
//! # Ok(())
//! # }
//! ```

mod selection;

pub use selection::Selection;

use std::sync::Arc;

use arrow::array::{Array, BooleanArray, Int64Array, UInt32Array};
use arrow::compute::{filter_record_batch, take};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::metrics::{pareto_mask, prediction_error, Hypervolume};
use crate::problem::ProblemDescriptor;
use crate::schema::{Field, Layout};
use crate::store::{RowId, RowTarget, SampleStore, Transaction, Value};
use crate::{Error, Result};

use selection::optional_rows;

/// Name of the sample table.
pub const TABLE: &str = "data";

/// Prediction error stamped on the initial samples (nothing to compare against).
pub const SEED_PRED_ERROR: f64 = 100.0;

/// Outcome of a [`record`](Agent::record) call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSummary {
    /// Hypervolume of all valid rows after the call
    pub hv: f64,
    /// Prediction error over valid post-initial rows (`None` if there are none)
    pub pred_error: Option<f64>,
    /// Rows flagged Pareto-optimal after the call
    pub pareto_rows: Vec<RowId>,
    /// Number of valid (fully evaluated) rows after the call
    pub n_valid: usize,
}

/// In-memory agent state; recovered from the store on reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AgentState {
    n_init_sample: Option<usize>,
    next_batch_id: i64,
}

impl AgentState {
    const fn fresh() -> Self {
        Self {
            n_init_sample: None,
            next_batch_id: 1,
        }
    }

    fn require_seeded(&self) -> Result<usize> {
        self.n_init_sample.ok_or(Error::NotSeeded)
    }

    fn recover(txn: &dyn Transaction, layout: &Layout) -> Result<Self> {
        let batch = txn.select(TABLE, layout.columns(Field::BatchId))?;
        let batch_ids = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| Error::SchemaError("batch_id column is not Int64".to_string()))?;

        if batch_ids.is_empty() {
            return Ok(Self::fresh());
        }

        let n_init = batch_ids.iter().filter(|id| *id == Some(0)).count();
        let max_batch = batch_ids.iter().flatten().max().unwrap_or(0);
        Ok(Self {
            n_init_sample: Some(n_init),
            next_batch_id: max_batch.max(0) + 1,
        })
    }
}

/// Sample-table agent for one experiment run.
///
/// `Agent` is `Send + Sync`; share it behind an `Arc` between the optimizer
/// driver, evaluation workers and readers.
#[derive(Debug)]
pub struct Agent<S: SampleStore> {
    store: Arc<S>,
    problem: ProblemDescriptor,
    layout: Arc<Layout>,
    hv: Hypervolume,
    state: Mutex<AgentState>,
}

impl<S: SampleStore> Agent<S> {
    /// Create the sample table, or reopen it if it already exists.
    ///
    /// Reopening recovers the initial sample count (rows with `batch_id = 0`)
    /// and continues the batch counter after the largest stored `batch_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaError`] if the table exists with different
    /// columns, and the validation errors of
    /// [`ProblemDescriptor::validate`].
    pub fn initialize(store: Arc<S>, problem: ProblemDescriptor) -> Result<Self> {
        problem.validate()?;
        let layout = Layout::new(problem.n_var(), problem.n_obj());
        let specs = layout.column_specs();

        let state = store.write(|txn| match txn.table_spec(TABLE) {
            None => {
                txn.create_table(TABLE, &specs)?;
                Ok(AgentState::fresh())
            }
            Some(existing) if existing == specs => AgentState::recover(&*txn, &layout),
            Some(existing) => {
                let names: Vec<&str> = existing.iter().map(|c| c.name.as_str()).collect();
                Err(Error::SchemaError(format!(
                    "table '{TABLE}' has columns [{}], expected {} design variables and {} objectives",
                    names.join(", "),
                    layout.n_var(),
                    layout.n_obj()
                )))
            }
        })?;

        info!(
            n_var = layout.n_var(),
            n_obj = layout.n_obj(),
            n_init_sample = ?state.n_init_sample,
            next_batch_id = state.next_batch_id,
            "agent initialized"
        );

        Ok(Self {
            store,
            hv: Hypervolume::new(problem.ref_point()),
            problem,
            layout: Arc::new(layout),
            state: Mutex::new(state),
        })
    }

    /// Problem descriptor the agent was initialized with.
    #[must_use]
    pub const fn problem(&self) -> &ProblemDescriptor {
        &self.problem
    }

    /// Field-to-column mapping of the sample table.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Shared store handle.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Size of the initial batch, `None` before `seed`.
    #[must_use]
    pub fn n_init_sample(&self) -> Option<usize> {
        self.state.lock().n_init_sample
    }

    /// Batch id the next `propose` will assign.
    #[must_use]
    pub fn next_batch_id(&self) -> i64 {
        self.state.lock().next_batch_id
    }

    /// Number of rows in the sample table.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn n_rows(&self) -> Result<usize> {
        self.store.read(|txn| txn.row_count(TABLE))
    }

    /// Load the initial, fully evaluated samples as batch 0.
    ///
    /// Stamps every row with the hypervolume of `y`, prediction error
    /// [`SEED_PRED_ERROR`], zero expectation/uncertainty, `config_id = 0`
    /// and `batch_id = 0`; `is_pareto` marks the Pareto front of `y`.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadySeeded`] on a second call
    /// - [`Error::DimensionMismatch`] for shape errors
    /// - [`Error::InvalidInput`] for an empty or non-finite input
    pub fn seed(&self, x: &[Vec<f64>], y: &[Vec<f64>]) -> Result<()> {
        if x.is_empty() {
            return Err(Error::InvalidInput("seed requires at least one sample".to_string()));
        }
        check_rows("X", x, x.len(), self.layout.n_var())?;
        check_rows("Y", y, x.len(), self.layout.n_obj())?;

        let mut state = self.state.lock();
        if let Some(n) = state.n_init_sample {
            return Err(Error::AlreadySeeded(n));
        }

        let n_obj = self.layout.n_obj();
        let hv = self.hv.compute(y);
        let is_pareto = pareto_mask(y);

        let columns = self.layout.flatten(&Field::ALL);
        let rows: Vec<Vec<Value>> = x
            .iter()
            .zip(y)
            .zip(&is_pareto)
            .map(|((x_row, y_row), &pareto)| {
                let mut row: Vec<Value> = Vec::with_capacity(columns.len());
                row.extend(x_row.iter().map(|&v| Value::real(v)));
                row.extend(y_row.iter().map(|&v| Value::real(v)));
                row.extend(std::iter::repeat(Value::real(0.0)).take(2 * n_obj));
                row.push(Value::real(hv));
                row.push(Value::real(SEED_PRED_ERROR));
                row.push(Value::Boolean(pareto));
                row.push(Value::integer(0));
                row.push(Value::integer(0));
                row
            })
            .collect();

        self.store.write(|txn| {
            let existing = txn.row_count(TABLE)?;
            if existing > 0 {
                return Err(Error::AlreadySeeded(existing));
            }
            txn.insert(TABLE, &columns, &rows)
        })?;

        state.n_init_sample = Some(x.len());
        info!(
            n_init_sample = x.len(),
            hv,
            n_pareto = is_pareto.iter().filter(|&&p| p).count(),
            "initial samples seeded"
        );
        Ok(())
    }

    /// Append a batch of proposed, not yet evaluated samples.
    ///
    /// Returns the new row ids, in input order. The batch receives the
    /// current batch counter, which then advances by one. An empty batch
    /// returns no ids and leaves the counter unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSeeded`] before `seed`
    /// - [`Error::DimensionMismatch`] if the three inputs differ in row count
    ///   or a row has the wrong width
    /// - [`Error::InvalidInput`] for non-finite values
    pub fn propose(
        &self,
        x: &[Vec<f64>],
        y_expected: &[Vec<f64>],
        y_uncertainty: &[Vec<f64>],
        config_id: i64,
    ) -> Result<Vec<RowId>> {
        let k = x.len();
        check_rows("X", x, k, self.layout.n_var())?;
        check_rows("Y_expected", y_expected, k, self.layout.n_obj())?;
        check_rows("Y_uncertainty", y_uncertainty, k, self.layout.n_obj())?;

        let mut state = self.state.lock();
        state.require_seeded()?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let batch_id = state.next_batch_id;

        let columns = self.layout.flatten(&[
            Field::X,
            Field::YExpected,
            Field::YUncertainty,
            Field::ConfigId,
            Field::BatchId,
        ]);
        let rows: Vec<Vec<Value>> = x
            .iter()
            .zip(y_expected)
            .zip(y_uncertainty)
            .map(|((x_row, e_row), u_row)| {
                x_row
                    .iter()
                    .chain(e_row)
                    .chain(u_row)
                    .map(|&v| Value::real(v))
                    .chain([Value::integer(config_id), Value::integer(batch_id)])
                    .collect()
            })
            .collect();

        // Row ids are read back under the same exclusive lock as the insert
        let last = self.store.write(|txn| {
            txn.insert(TABLE, &columns, &rows)?;
            txn.last_inserted_id(TABLE)
        })?;

        state.next_batch_id += 1;
        let first = last + 1 - k as RowId;
        let rowids: Vec<RowId> = (first..=last).collect();

        info!(batch_id, config_id, first_row = first, last_row = last, "batch proposed");
        Ok(rowids)
    }

    /// Record measured objective values for proposed rows.
    ///
    /// `y[i]` belongs to `rowids[i]`. Within one transaction the agent
    /// applies the measurements, recomputes hypervolume, prediction error
    /// (valid rows after the initial batch) and Pareto flags over every
    /// valid row, stamps `hv`/`pred_error` on the recorded rows and resets
    /// `is_pareto` table-wide. Recording a row again overwrites it.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSeeded`] before `seed`
    /// - [`Error::InvalidRowId`] for a row id outside the table
    /// - [`Error::DuplicateRowId`] if a row id repeats
    /// - [`Error::DimensionMismatch`] for shape errors
    /// - [`Error::InvalidInput`] for an empty call or non-finite values
    ///
    /// On error nothing is written.
    pub fn record(&self, y: &[Vec<f64>], rowids: &[RowId]) -> Result<RecordSummary> {
        if rowids.is_empty() {
            return Err(Error::InvalidInput("record requires at least one row".to_string()));
        }
        check_rows("Y", y, rowids.len(), self.layout.n_obj())?;
        if let Some(dup) = crate::store::first_duplicate(rowids) {
            return Err(Error::DuplicateRowId(dup));
        }

        let state = self.state.lock();
        let n_init = state.require_seeded()?;

        let summary = self.store.write(|txn| self.apply_record(txn, y, rowids, n_init))?;

        info!(
            rows = rowids.len(),
            hv = summary.hv,
            pred_error = ?summary.pred_error,
            n_valid = summary.n_valid,
            n_pareto = summary.pareto_rows.len(),
            "evaluations recorded"
        );
        drop(state);
        Ok(summary)
    }

    fn apply_record(
        &self,
        txn: &mut dyn Transaction,
        y: &[Vec<f64>],
        rowids: &[RowId],
        n_init: usize,
    ) -> Result<RecordSummary> {
        let max_row_id = txn.last_inserted_id(TABLE)?;
        if let Some(&row_id) = rowids.iter().find(|&&id| id == 0 || id > max_row_id) {
            return Err(Error::InvalidRowId { row_id, max_row_id });
        }

        let n_obj = self.layout.n_obj();
        let batch = txn.select(TABLE, &self.layout.flatten(&[Field::Y, Field::YExpected]))?;
        let mut all_y = optional_rows(&batch, 0..n_obj)?;
        let all_expected = optional_rows(&batch, n_obj..2 * n_obj)?;

        for (row_id, values) in rowids.iter().zip(y) {
            all_y[row_index(*row_id)] = values.iter().copied().map(Some).collect();
        }

        // Valid rows: every measured objective present
        let mut valid_ids = Vec::new();
        let mut valid_y = Vec::new();
        let mut actual = Vec::new();
        let mut predicted = Vec::new();
        for (i, (row, expected)) in all_y.iter().zip(&all_expected).enumerate() {
            let Some(measured) = row.iter().copied().collect::<Option<Vec<f64>>>() else {
                continue;
            };
            let row_id = i as RowId + 1;
            if i >= n_init {
                if let Some(expected) = expected.iter().copied().collect::<Option<Vec<f64>>>() {
                    actual.push(measured.clone());
                    predicted.push(expected);
                }
            }
            valid_ids.push(row_id);
            valid_y.push(measured);
        }

        let hv = self.hv.compute(&valid_y);
        let pred_error = prediction_error(&actual, &predicted)?;
        let pareto_rows: Vec<RowId> = valid_ids
            .iter()
            .zip(pareto_mask(&valid_y))
            .filter_map(|(&id, pareto)| pareto.then_some(id))
            .collect();

        let columns = self.layout.flatten(&[Field::Y, Field::Hv, Field::PredError]);
        for (&row_id, values) in rowids.iter().zip(y) {
            let row: Vec<Value> = values
                .iter()
                .map(|&v| Value::real(v))
                .chain([Value::real(hv), Value::Real(pred_error)])
                .collect();
            txn.update(TABLE, &columns, &row, &RowTarget::one(row_id))?;
        }

        let is_pareto = self.layout.flatten(&[Field::IsPareto]);
        txn.update(TABLE, &is_pareto, &[Value::Boolean(false)], &RowTarget::All)?;
        txn.update(
            TABLE,
            &is_pareto,
            &[Value::Boolean(true)],
            &RowTarget::Ids(pareto_rows.clone()),
        )?;

        Ok(RecordSummary {
            hv,
            pred_error,
            pareto_rows,
            n_valid: valid_ids.len(),
        })
    }

    /// Project the table onto `fields`.
    ///
    /// With `valid_only`, a row is dropped if any of its requested columns is
    /// unset; the check spans all requested fields jointly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty or repeated field list,
    /// and store errors.
    pub fn query(&self, fields: &[Field], valid_only: bool) -> Result<Selection> {
        check_fields(fields)?;
        let columns = self.layout.flatten(fields);

        let batch = self.store.read(|txn| txn.select(TABLE, &columns))?;
        let all_ids = (1..=batch.num_rows() as RowId).collect::<Vec<_>>();

        let (batch, row_ids) = if valid_only {
            let keep: Vec<bool> = (0..batch.num_rows())
                .map(|row| batch.columns().iter().all(|c| c.is_valid(row)))
                .collect();
            let row_ids: Vec<RowId> = all_ids
                .into_iter()
                .zip(&keep)
                .filter_map(|(id, &k)| k.then_some(id))
                .collect();
            let filtered = filter_record_batch(&batch, &BooleanArray::from(keep))?;
            (filtered, row_ids)
        } else {
            (batch, all_ids)
        };

        debug!(fields = ?fields, valid_only, rows = row_ids.len(), "query");
        Ok(Selection::new(
            Arc::clone(&self.layout),
            fields.to_vec(),
            batch,
            row_ids,
        ))
    }

    /// Project specific rows onto `fields`, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRowId`] for a row id outside the table, and
    /// the errors of [`query`](Self::query).
    pub fn query_rows(&self, fields: &[Field], rowids: &[RowId]) -> Result<Selection> {
        check_fields(fields)?;
        let columns = self.layout.flatten(fields);

        let batch = self.store.read(|txn| {
            let max_row_id = txn.last_inserted_id(TABLE)?;
            if let Some(&row_id) = rowids.iter().find(|&&id| id == 0 || id > max_row_id) {
                return Err(Error::InvalidRowId { row_id, max_row_id });
            }
            txn.select(TABLE, &columns)
        })?;

        let indices = rowids
            .iter()
            .map(|&id| {
                u32::try_from(id - 1)
                    .map_err(|_| Error::Other(format!("row id {id} exceeds u32 index range")))
            })
            .collect::<Result<Vec<u32>>>()?;
        let indices = UInt32Array::from(indices);
        let arrays = batch
            .columns()
            .iter()
            .map(|c| take(c.as_ref(), &indices, None))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(rowids.len()));
        let taken = RecordBatch::try_new_with_options(batch.schema(), arrays, &options)?;

        Ok(Selection::new(
            Arc::clone(&self.layout),
            fields.to_vec(),
            taken,
            rowids.to_vec(),
        ))
    }

    /// Whether each row already holds measured values for every objective.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRowId`] for a row id outside the table.
    pub fn evaluated(&self, rowids: &[RowId]) -> Result<Vec<bool>> {
        let selection = self.query_rows(&[Field::Y], rowids)?;
        Ok(selection
            .optional_matrix(Field::Y)?
            .into_iter()
            .map(|row| row.iter().all(Option::is_some))
            .collect())
    }

    /// Release the store.
    ///
    /// # Errors
    ///
    /// Returns store release errors.
    pub fn close(self) -> Result<()> {
        info!("agent closed");
        self.store.close()
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn row_index(row_id: RowId) -> usize {
    (row_id - 1) as usize
}

fn check_rows(name: &str, rows: &[Vec<f64>], expected_rows: usize, width: usize) -> Result<()> {
    if rows.len() != expected_rows {
        return Err(Error::DimensionMismatch(format!(
            "{name} has {} rows, expected {expected_rows}",
            rows.len()
        )));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(Error::DimensionMismatch(format!(
                "{name} row {i} has {} values, expected {width}",
                row.len()
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!("{name} row {i} holds a non-finite value")));
        }
    }
    Ok(())
}

fn check_fields(fields: &[Field]) -> Result<()> {
    if fields.is_empty() {
        return Err(Error::InvalidInput("query requires at least one field".to_string()));
    }
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].contains(field) {
            return Err(Error::InvalidInput(format!("field '{field}' requested twice")));
        }
    }
    Ok(())
}
