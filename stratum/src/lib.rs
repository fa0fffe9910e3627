//! # Stratum Storage Engine
//! The storage engine for the Quarry database.
//! This crate is responsible for the on-disk and in-memory representation of
//! tables: fixed-size slotted pages, row-major and column-major table files,
//! and the buffer pool that caches pages and enforces page-level two-phase
//! locking across transactions.

/// The buffer pool: page cache, lock table, and transaction lifecycle.
pub mod buffer_pool;
/// The column-striped table file.
pub mod column_file;
/// The page layout for a single column.
pub mod column_page;
/// The capability seam shared by every table file.
pub mod db_file;
/// Storage error types.
pub mod errors;
/// Test-only fault injection for the flush paths.
pub mod fault;
/// The row-major table file.
pub mod heap_file;
/// The page layout for full rows.
pub mod heap_page;
/// Lock modes and the waits-for graph for deadlock detection.
pub mod lock_manager;
/// The on-disk page format shared by both page kinds.
pub mod page;
/// Transaction identifiers.
pub mod transaction;
/// Tuples, schemas, values, and their binary codec.
pub mod tuple;

/// The size of a single page in bytes, on disk and in memory.
pub const PAGE_SIZE: usize = 4096;

/// Bytes occupied by the page header: slot capacity and used-slot count,
/// each a little-endian `i32`.
pub const PAGE_HEADER_SIZE: usize = 8;

/// Every string field serializes to exactly this many bytes, truncated and
/// right-padded with NUL.
pub const STRING_LENGTH: usize = 32;

pub use buffer_pool::{BufferPool, SharedPage};
pub use column_file::ColumnFile;
pub use column_page::ColumnPage;
pub use db_file::{DbFile, PageKey, TupleStream};
pub use heap_file::HeapFile;
pub use heap_page::HeapPage;
pub use errors::{StorageError, StorageResult};
pub use lock_manager::LockMode;
pub use page::Page;
pub use transaction::TransactionId;
pub use tuple::{FieldKind, FieldType, RecordId, Tuple, TupleDesc, Value};

static DEBUG_LOGS: std::sync::OnceLock<bool> = std::sync::OnceLock::new();

/// Whether `STRATUM_DEBUG_LOG` was set when logging was first consulted.
/// The flag is read once and cached; the engine logs on hot paths.
pub fn debug_logs_enabled() -> bool {
    *DEBUG_LOGS.get_or_init(|| std::env::var_os("STRATUM_DEBUG_LOG").is_some())
}

/// Diagnostics go to stderr so callers piping query output keep a clean
/// stdout.
#[macro_export]
macro_rules! stratum_debug_log {
    ($($arg:tt)*) => {
        if $crate::debug_logs_enabled() {
            eprintln!($($arg)*);
        }
    };
}
