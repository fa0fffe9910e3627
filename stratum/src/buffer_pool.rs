//! The buffer pool: a bounded page cache that doubles as the lock manager.
//!
//! The pool is the only shared mutable resource in the engine. The cache,
//! the lock table, and the waits-for graph all live behind one pool-wide
//! mutex; every transition of that state happens while holding it. The
//! pool is NO-STEAL (a dirty page is never evicted) and FORCE (every page
//! a transaction dirtied is written to disk at commit, before its locks are
//! released), which is why neither commit nor abort needs a log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use crate::db_file::{DbFile, PageKey};
use crate::errors::{StorageError, StorageResult};
use crate::lock_manager::{LockMode, WaitForGraph};
use crate::page::Page;
use crate::transaction::TransactionId;

/// How long a blocked transaction sleeps between lock acquisition attempts.
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// A cached page. The pool owns the cache entry; callers get shared handles
/// and take the page's own lock for the duration of each read or write.
pub type SharedPage = Arc<RwLock<Page>>;

struct Frame {
    page: SharedPage,
    file: Arc<dyn DbFile>,
}

/// One page-level lock held by a transaction, together with everything
/// needed to flush or discard the page when the transaction ends.
struct HeldLock {
    key: PageKey,
    mode: LockMode,
    page: SharedPage,
    file: Arc<dyn DbFile>,
}

#[derive(Default)]
struct PoolState {
    pages: HashMap<PageKey, Frame>,
    locks: HashMap<TransactionId, Vec<HeldLock>>,
    waits_for: WaitForGraph,
}

impl PoolState {
    /// Transactions other than `tid` holding a lock on `key` that is
    /// incompatible with `mode`, in a deterministic order.
    fn conflicting_holders(
        &self,
        key: &PageKey,
        tid: TransactionId,
        mode: LockMode,
    ) -> Vec<TransactionId> {
        let mut holders: Vec<TransactionId> = self
            .locks
            .iter()
            .filter(|(holder, _)| **holder != tid)
            .filter(|(_, held)| {
                held.iter()
                    .any(|h| h.key == *key && !mode.compatible_with(h.mode))
            })
            .map(|(holder, _)| *holder)
            .collect();
        holders.sort_unstable();
        holders
    }

    fn record_lock(
        &mut self,
        tid: TransactionId,
        key: &PageKey,
        mode: LockMode,
        page: &SharedPage,
        file: &Arc<dyn DbFile>,
    ) {
        self.waits_for.ensure_vertex(tid);
        let held = self.locks.entry(tid).or_default();
        if let Some(existing) = held.iter_mut().find(|h| h.key == *key && h.mode == mode) {
            // The page may have been evicted while clean and re-read since
            // the lock was first taken; keep the record pointing at the
            // live cache entry so commit flushes the copy that changed.
            if !Arc::ptr_eq(&existing.page, page) {
                existing.page = page.clone();
            }
            return;
        }
        held.push(HeldLock {
            key: key.clone(),
            mode,
            page: page.clone(),
            file: file.clone(),
        });
    }

    /// Drop a non-dirty page from the cache, preferring the smallest
    /// `(page_no, file)`. Fails when every cached page is dirty.
    fn evict_clean_page(&mut self) -> StorageResult<()> {
        let mut victim: Option<PageKey> = None;
        for (key, frame) in &self.pages {
            if frame.page.read().unwrap().is_dirty() {
                continue;
            }
            let better = match &victim {
                None => true,
                Some(v) => (key.page_no, &key.file) < (v.page_no, &v.file),
            };
            if better {
                victim = Some(key.clone());
            }
        }
        match victim {
            Some(key) => {
                crate::stratum_debug_log!("[BufferPool] evicting clean page {key:?}");
                self.pages.remove(&key);
                Ok(())
            }
            None => Err(StorageError::CacheFull),
        }
    }
}

/// A bounded cache of pages keyed by [`PageKey`], enforcing page-level
/// strict two-phase locking with deadlock detection.
pub struct BufferPool {
    num_pages: usize,
    state: Mutex<PoolState>,
}

impl BufferPool {
    /// Create a pool caching at most `num_pages` pages.
    pub fn new(num_pages: usize) -> Self {
        BufferPool {
            num_pages,
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Register `tid`: an empty held-lock list and a fresh vertex in the
    /// waits-for graph.
    pub fn begin(&self, tid: TransactionId) {
        let mut state = self.state.lock().unwrap();
        state.locks.entry(tid).or_default();
        state.waits_for.ensure_vertex(tid);
    }

    /// Acquire `mode` on `(file, page_no)` for `tid` and return the page,
    /// materializing it through the cache.
    ///
    /// Blocks while an incompatible lock is held, re-checking for deadlock
    /// on each attempt. When the waits-for graph shows a cycle reachable
    /// from `tid`, `tid` itself is aborted and the call fails with
    /// [`StorageError::Deadlock`]; the caller must treat the transaction as
    /// dead and retry from the top.
    pub fn get_page(
        &self,
        file: &Arc<dyn DbFile>,
        page_no: usize,
        tid: TransactionId,
        mode: LockMode,
    ) -> StorageResult<SharedPage> {
        let key = file.page_key(page_no);
        loop {
            let mut state = self.state.lock().unwrap();

            let conflicts = state.conflicting_holders(&key, tid, mode);
            if !conflicts.is_empty() {
                state.waits_for.ensure_vertex(tid);
                state.waits_for.clear_edges_from(tid);
                for holder in &conflicts {
                    state.waits_for.add_edge(tid, *holder);
                }
                if state.waits_for.cycle_from(tid) {
                    drop(state);
                    crate::stratum_debug_log!(
                        "[BufferPool] deadlock: aborting tx {tid} waiting on {key:?}"
                    );
                    self.abort(tid);
                    return Err(StorageError::Deadlock(tid));
                }
                drop(state);
                thread::sleep(LOCK_RETRY_INTERVAL);
                continue;
            }

            // Lock granted; any edges left from earlier attempts are stale.
            state.waits_for.clear_edges_from(tid);

            if let Some(frame) = state.pages.get(&key) {
                let page = frame.page.clone();
                state.record_lock(tid, &key, mode, &page, file);
                return Ok(page);
            }

            let page = file.read_page(page_no)?;
            if state.pages.len() >= self.num_pages {
                state.evict_clean_page()?;
            }
            let shared: SharedPage = Arc::new(RwLock::new(page));
            state.pages.insert(
                key.clone(),
                Frame {
                    page: shared.clone(),
                    file: file.clone(),
                },
            );
            state.record_lock(tid, &key, mode, &shared, file);
            return Ok(shared);
        }
    }

    /// Commit `tid`: write every page it dirtied back through the owning
    /// file, then release its locks and remove it from the waits-for graph.
    ///
    /// A failed flush is reported after the remaining pages have been
    /// attempted; the transaction's locks are released either way.
    pub fn commit(&self, tid: TransactionId) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        let held = state.locks.remove(&tid).unwrap_or_default();
        state.waits_for.remove(tid);

        // A successful flush clears the dirty flag, so a page reachable
        // through several lock records is written once.
        let mut first_err = None;
        for lock in &held {
            let mut page = lock.page.write().unwrap();
            if page.is_dirty() {
                crate::stratum_debug_log!("[BufferPool] commit {tid}: flushing {:?}", lock.key);
                if let Err(e) = lock.file.flush_page(&mut page) {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Abort `tid`: drop every page it dirtied from the cache (no-steal
    /// means none of them ever reached disk), release its locks, and remove
    /// it from the waits-for graph.
    pub fn abort(&self, tid: TransactionId) {
        let mut state = self.state.lock().unwrap();
        let held = state.locks.remove(&tid).unwrap_or_default();
        for lock in &held {
            if lock.mode == LockMode::Exclusive && lock.page.read().unwrap().is_dirty() {
                crate::stratum_debug_log!("[BufferPool] abort {tid}: discarding {:?}", lock.key);
                state.pages.remove(&lock.key);
            }
        }
        state.waits_for.remove(tid);
    }

    /// Testing hook: write every cached page back through its owning file,
    /// dirty or not.
    pub fn flush_all(&self) -> StorageResult<()> {
        let state = self.state.lock().unwrap();
        for frame in state.pages.values() {
            let mut page = frame.page.write().unwrap();
            frame.file.flush_page(&mut page)?;
        }
        Ok(())
    }

    /// Page numbers of this file currently in the cache, ascending. The
    /// files use this for their cached-pages-first insert pass.
    pub fn cached_page_numbers(&self, file_name: &str) -> Vec<usize> {
        let state = self.state.lock().unwrap();
        let mut pages: Vec<usize> = state
            .pages
            .keys()
            .filter(|k| k.file == file_name)
            .map(|k| k.page_no)
            .collect();
        pages.sort_unstable();
        pages
    }

    pub fn cached_page_count(&self) -> usize {
        self.state.lock().unwrap().pages.len()
    }

    pub fn is_cached(&self, key: &PageKey) -> bool {
        self.state.lock().unwrap().pages.contains_key(key)
    }
}
