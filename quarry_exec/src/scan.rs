use crate::errors::{ExecError, ExecResult};
use crate::{OpStream, Operator};
use std::sync::Arc;
use stratum::{DbFile, TransactionId, TupleDesc};

/// Sequential scan over a table file: yields every tuple the file's
/// iterator produces, under shared locks on the caller's transaction.
pub struct SeqScan {
    file: Arc<dyn DbFile>,
}

impl SeqScan {
    pub fn new(file: Arc<dyn DbFile>) -> Self {
        SeqScan { file }
    }
}

impl Operator for SeqScan {
    fn descriptor(&self) -> TupleDesc {
        self.file.descriptor().clone()
    }

    fn tuples(&self, tid: TransactionId) -> ExecResult<OpStream> {
        let stream = self.file.scan(tid)?;
        Ok(Box::new(stream.map(|r| r.map_err(ExecError::from))))
    }
}
