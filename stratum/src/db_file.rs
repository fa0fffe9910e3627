use crate::errors::StorageResult;
use crate::page::Page;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};

/// A lazy, finite sequence of tuples. Every yielded tuple carries its
/// record id. After yielding an `Err` the stream is exhausted.
pub type TupleStream = Box<dyn Iterator<Item = StorageResult<Tuple>> + Send>;

/// Identifies one page of one table file; the buffer pool's cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub file: String,
    pub page_no: usize,
}

/// The capability set shared by the heap and column files.
///
/// Files own only their metadata and backing path; cached page objects are
/// owned by the buffer pool, and all page access during `insert_tuple`,
/// `delete_tuple`, and `scan` goes through it so page-level locks are
/// acquired on the caller's transaction.
pub trait DbFile: Send + Sync {
    /// The backing file path, also the file component of this file's page
    /// keys.
    fn file_name(&self) -> &str;

    fn descriptor(&self) -> &TupleDesc;

    /// Number of whole pages in the backing file, from a fresh stat.
    fn num_pages(&self) -> usize;

    fn page_key(&self, page_no: usize) -> PageKey {
        PageKey {
            file: self.file_name().to_string(),
            page_no,
        }
    }

    /// Materialize a page from disk. Called by the buffer pool on a cache
    /// miss; fails if `page_no` is past the end of the file.
    fn read_page(&self, page_no: usize) -> StorageResult<Page>;

    /// Write the page back at its offset and clear its dirty flag.
    fn flush_page(&self, page: &mut Page) -> StorageResult<()>;

    /// Add a tuple, assigning its record id.
    fn insert_tuple(&self, t: &mut Tuple, tid: TransactionId) -> StorageResult<()>;

    /// Remove the tuple addressed by `t`'s record id.
    fn delete_tuple(&self, t: &Tuple, tid: TransactionId) -> StorageResult<()>;

    /// All tuples of the file, in ascending page order and slot order
    /// within each page, read under shared locks.
    fn scan(&self, tid: TransactionId) -> StorageResult<TupleStream>;
}
