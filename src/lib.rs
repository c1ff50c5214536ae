//! # mobo-db: Sample Ledger for Human-in-the-Loop Multi-Objective Optimization
//!
//! mobo-db tracks the design points of a multi-objective Bayesian
//! optimization experiment: the batches an optimizer proposes, the objective
//! values evaluation workers measure for them, and the quantities derived
//! from the measurements (Pareto flags, hypervolume, prediction error).
//!
//! ## Design Principles
//!
//! - **Transactional recomputation**: every mutating call reads, recomputes
//!   and writes inside one exclusive store transaction; failure rolls back
//! - **Explicit unset values**: not-yet-measured objectives are Arrow nulls,
//!   never NaN
//! - **Closed schema**: semantic fields are an enum resolved once to
//!   physical columns
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use mobo_db::agent::Agent;
//! use mobo_db::problem::ProblemDescriptor;
//! use mobo_db::schema::Field;
//! use mobo_db::store::MemoryStore;
//!
//! # fn main() -> mobo_db::Result<()> {
//! let problem = ProblemDescriptor::new(2, 2).with_ref_point(vec![1.0, 1.0]);
//! let agent = Agent::initialize(Arc::new(MemoryStore::new()), problem)?;
//!
//! // Initial design, evaluated up front
//! agent.seed(
//!     &[vec![0.0, 0.0], vec![1.0, 1.0]],
//!     &[vec![0.2, 0.8], vec![0.8, 0.2]],
//! )?;
//!
//! // Optimizer proposes a batch; a worker measures it later
//! let rowids = agent.propose(&[vec![0.5, 0.5]], &[vec![0.4, 0.4]], &[vec![0.05, 0.05]], 0)?;
//! let summary = agent.record(&[vec![0.5, 0.5]], &rowids)?;
//! assert!(summary.hv > 0.0);
//!
//! let y = agent.query(&[Field::Y], true)?.matrix(Field::Y)?;
//! assert_eq!(y.len(), 3);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod agent;
pub mod error;
pub mod metrics;
pub mod problem;
pub mod schema;
pub mod store;

pub use agent::{Agent, RecordSummary, Selection};
pub use error::{Error, Result};
pub use problem::ProblemDescriptor;
pub use schema::Field;
