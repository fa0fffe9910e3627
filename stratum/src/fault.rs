//! Test-only fault injection for the file flush paths.
//!
//! A fault is armed per thread and per site; the next flush that passes
//! through the site fails and the fault disarms itself. Tests use this to
//! observe how commit handles a write failure without real disk faults.

use crate::errors::{StorageError, StorageResult};
use std::cell::Cell;
use std::io;

/// Write-path sites where a fault can be armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSite {
    HeapFlush,
    ColumnFlush,
}

thread_local! {
    static HEAP_FLUSH_FAULT: Cell<bool> = const { Cell::new(false) };
    static COLUMN_FLUSH_FAULT: Cell<bool> = const { Cell::new(false) };
}

fn with_cell<R>(site: FaultSite, f: impl FnOnce(&Cell<bool>) -> R) -> R {
    match site {
        FaultSite::HeapFlush => HEAP_FLUSH_FAULT.with(f),
        FaultSite::ColumnFlush => COLUMN_FLUSH_FAULT.with(f),
    }
}

/// Arm a one-shot fault: the next flush through `site` on this thread
/// fails, then the site is clear again.
pub fn arm(site: FaultSite) {
    with_cell(site, |armed| armed.set(true));
}

/// Consume an armed fault, surfacing it as the flush's storage error.
pub(crate) fn trip(site: FaultSite) -> StorageResult<()> {
    if with_cell(site, |armed| armed.replace(false)) {
        return Err(StorageError::Io(io::Error::other(format!(
            "injected fault at {site:?}"
        ))));
    }
    Ok(())
}
