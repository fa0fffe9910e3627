//! # Quarry Execution Layer
//! Operators over the storage engine. An operator exposes the schema of the
//! rows it produces and a restartable tuple stream; the DML operators drain
//! a child stream into a table file and report how many rows they touched.

pub mod dml;
pub mod errors;
pub mod scan;

use errors::ExecResult;
use stratum::{TransactionId, Tuple, TupleDesc};

/// A lazy, finite stream of operator output rows.
pub type OpStream = Box<dyn Iterator<Item = ExecResult<Tuple>> + Send>;

/// The operator seam. Each call to [`Operator::tuples`] starts a fresh pass
/// over the operator's output on behalf of the given transaction.
pub trait Operator: Send + Sync {
    fn descriptor(&self) -> TupleDesc;

    fn tuples(&self, tid: TransactionId) -> ExecResult<OpStream>;
}

pub use dml::{Delete, Insert};
pub use errors::ExecError;
pub use scan::SeqScan;
