use crate::transaction::TransactionId;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("page {page_no} is out of bounds for {file}")]
    PageOutOfBounds { file: String, page_no: usize },

    #[error("no free slots on page {0}")]
    PageFull(usize),

    #[error("slot {slot} is out of range for page {page_no}")]
    BadSlot { page_no: usize, slot: usize },

    #[error("record id addresses page {requested}, not page {actual}")]
    WrongPage { requested: usize, actual: usize },

    #[error("no tuple with the given record id on page {page_no}")]
    TupleNotFound { page_no: usize },

    #[error("invalid record id: {0}")]
    InvalidRid(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("buffer pool is full and every cached page is dirty")]
    CacheFull,

    #[error("transaction {0} aborted: deadlock detected")]
    Deadlock(TransactionId),

    #[error("corrupted data: {0}")]
    Corrupted(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
