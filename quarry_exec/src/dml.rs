use crate::errors::ExecResult;
use crate::{OpStream, Operator};
use std::sync::Arc;
use stratum::{DbFile, FieldKind, FieldType, TransactionId, Tuple, TupleDesc, Value};

/// Descriptor shared by the DML operators: a single integer field named
/// `count`, qualified like the child's first field.
fn count_descriptor(child: &dyn Operator) -> TupleDesc {
    let qualifier = child
        .descriptor()
        .fields
        .first()
        .and_then(|f| f.qualifier.clone());
    TupleDesc::new(vec![FieldType {
        name: "count".to_string(),
        qualifier,
        kind: FieldKind::Int,
    }])
}

fn count_tuple(desc: TupleDesc, count: i64) -> Tuple {
    Tuple::new(desc, vec![Value::Int(count)])
}

/// Inserts every tuple of the child into the target file and yields one
/// tuple holding the number of rows inserted. Holds no state beyond the
/// child and a running counter.
pub struct Insert {
    file: Arc<dyn DbFile>,
    child: Box<dyn Operator>,
}

impl Insert {
    pub fn new(file: Arc<dyn DbFile>, child: Box<dyn Operator>) -> Self {
        Insert { file, child }
    }
}

impl Operator for Insert {
    fn descriptor(&self) -> TupleDesc {
        count_descriptor(self.child.as_ref())
    }

    fn tuples(&self, tid: TransactionId) -> ExecResult<OpStream> {
        let child = self.child.tuples(tid)?;
        let file = self.file.clone();
        let desc = self.descriptor();
        Ok(Box::new(std::iter::once_with(move || {
            let mut count: i64 = 0;
            for t in child {
                let mut t = t?;
                file.insert_tuple(&mut t, tid)?;
                count += 1;
            }
            Ok(count_tuple(desc, count))
        })))
    }
}

/// Deletes every tuple of the child from the target file and yields one
/// tuple holding the number of rows deleted. The child's tuples must carry
/// the record ids the file assigned them.
pub struct Delete {
    file: Arc<dyn DbFile>,
    child: Box<dyn Operator>,
}

impl Delete {
    pub fn new(file: Arc<dyn DbFile>, child: Box<dyn Operator>) -> Self {
        Delete { file, child }
    }
}

impl Operator for Delete {
    fn descriptor(&self) -> TupleDesc {
        count_descriptor(self.child.as_ref())
    }

    fn tuples(&self, tid: TransactionId) -> ExecResult<OpStream> {
        let child = self.child.tuples(tid)?;
        let file = self.file.clone();
        let desc = self.descriptor();
        Ok(Box::new(std::iter::once_with(move || {
            let mut count: i64 = 0;
            for t in child {
                let t = t?;
                file.delete_tuple(&t, tid)?;
                count += 1;
            }
            Ok(count_tuple(desc, count))
        })))
    }
}
