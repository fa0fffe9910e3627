//! The on-disk page format shared by heap and column pages.
//!
//! Every page is exactly [`PAGE_SIZE`] bytes:
//!
//! ```text
//! offset 0..4   i32 LE   total slot capacity
//! offset 4..8   i32 LE   used slot count
//! offset 8..    payload  used tuples packed in slot order, zero-padded
//! ```

use crate::column_page::ColumnPage;
use crate::errors::{StorageError, StorageResult};
use crate::heap_page::HeapPage;
use crate::{PAGE_HEADER_SIZE, PAGE_SIZE};

/// Number of tuple slots that fit on a page, given the fixed tuple width.
pub const fn slot_capacity(bytes_per_tuple: usize) -> usize {
    (PAGE_SIZE - PAGE_HEADER_SIZE) / bytes_per_tuple
}

pub(crate) fn write_header(buf: &mut Vec<u8>, capacity: usize, used: usize) {
    buf.extend_from_slice(&(capacity as i32).to_le_bytes());
    buf.extend_from_slice(&(used as i32).to_le_bytes());
}

pub(crate) fn read_header(bytes: &[u8]) -> StorageResult<(usize, usize)> {
    if bytes.len() < PAGE_HEADER_SIZE {
        return Err(StorageError::Corrupted(format!(
            "page header needs {PAGE_HEADER_SIZE} bytes, have {}",
            bytes.len()
        )));
    }
    let capacity = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let used = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if capacity < 0 || used < 0 || used > capacity {
        return Err(StorageError::Corrupted(format!(
            "page header claims {used} used of {capacity} slots"
        )));
    }
    Ok((capacity as usize, used as usize))
}

/// An in-memory page. The set of page kinds is closed: a page holds either
/// full rows (heap) or single-field values of one column.
#[derive(Debug)]
pub enum Page {
    Heap(HeapPage),
    Column(ColumnPage),
}

impl Page {
    pub fn page_no(&self) -> usize {
        match self {
            Page::Heap(p) => p.page_no(),
            Page::Column(p) => p.page_no(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        match self {
            Page::Heap(p) => p.is_dirty(),
            Page::Column(p) => p.is_dirty(),
        }
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        match self {
            Page::Heap(p) => p.set_dirty(dirty),
            Page::Column(p) => p.set_dirty(dirty),
        }
    }

    /// Serialize to exactly [`PAGE_SIZE`] bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Page::Heap(p) => p.to_bytes(),
            Page::Column(p) => p.to_bytes(),
        }
    }

    pub fn as_heap(&self) -> Option<&HeapPage> {
        match self {
            Page::Heap(p) => Some(p),
            Page::Column(_) => None,
        }
    }

    pub fn as_heap_mut(&mut self) -> Option<&mut HeapPage> {
        match self {
            Page::Heap(p) => Some(p),
            Page::Column(_) => None,
        }
    }

    pub fn as_column(&self) -> Option<&ColumnPage> {
        match self {
            Page::Column(p) => Some(p),
            Page::Heap(_) => None,
        }
    }

    pub fn as_column_mut(&mut self) -> Option<&mut ColumnPage> {
        match self {
            Page::Column(p) => Some(p),
            Page::Heap(_) => None,
        }
    }
}
