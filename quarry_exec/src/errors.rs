use stratum::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Storage(StorageError),

    /// The transaction was chosen as the deadlock victim; the caller must
    /// treat it as aborted and retry from the top.
    #[error("transaction aborted by deadlock detection")]
    Aborted,
}

impl From<StorageError> for ExecError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Deadlock(_) => ExecError::Aborted,
            other => ExecError::Storage(other),
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
