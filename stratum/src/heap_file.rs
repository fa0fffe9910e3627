use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use crate::buffer_pool::BufferPool;
use crate::db_file::{DbFile, TupleStream};
use crate::errors::{StorageError, StorageResult};
use crate::fault::{self, FaultSite};
use crate::heap_page::HeapPage;
use crate::lock_manager::LockMode;
use crate::page::Page;
use crate::transaction::TransactionId;
use crate::tuple::{RecordId, Tuple, TupleDesc};
use crate::PAGE_SIZE;

/// A row-major table file: an unordered collection of tuples arranged as a
/// sequence of [`HeapPage`]s.
///
/// The file owns its path, schema, and backing file handle; cached pages
/// belong to the buffer pool, and all page access during inserts, deletes,
/// and scans goes through the pool so locks land on the caller's
/// transaction. An internal page counter serializes appends; it is never
/// held across a pool call, because the pool may block.
pub struct HeapFile {
    me: Weak<HeapFile>,
    path: PathBuf,
    file_name: String,
    desc: TupleDesc,
    pool: Arc<BufferPool>,
    file: Mutex<std::fs::File>,
    curr_pages: Mutex<usize>,
}

impl HeapFile {
    /// Open or create the heap file at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        desc: TupleDesc,
        pool: Arc<BufferPool>,
    ) -> StorageResult<Arc<HeapFile>> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let curr_pages = (file.metadata()?.len() / PAGE_SIZE as u64) as usize;
        let file_name = path.to_string_lossy().into_owned();
        Ok(Arc::new_cyclic(|me| HeapFile {
            me: me.clone(),
            path,
            file_name,
            desc,
            pool,
            file: Mutex::new(file),
            curr_pages: Mutex::new(curr_pages),
        }))
    }

    fn handle(&self) -> Arc<dyn DbFile> {
        let me: Arc<HeapFile> = self.me.upgrade().expect("heap file used outside an Arc");
        me
    }

    fn write_page_at(&self, page_no: usize, bytes: &[u8]) -> StorageResult<()> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((page_no * PAGE_SIZE) as u64))?;
        file.write_all(bytes)?;
        Ok(())
    }

    /// Append a fresh, empty page and return its number. The page image is
    /// written immediately so the file grows before any tuple lands on it;
    /// the tuples themselves only reach disk at commit.
    fn append_page(&self) -> StorageResult<usize> {
        let mut curr = self.curr_pages.lock().unwrap();
        let page_no = *curr;
        let fresh = HeapPage::new(&self.desc, page_no);
        self.write_page_at(page_no, &fresh.to_bytes())?;
        *curr += 1;
        crate::stratum_debug_log!("[HeapFile] {} appended page {page_no}", self.file_name);
        Ok(page_no)
    }

    fn try_insert_on(
        &self,
        page_no: usize,
        t: &Tuple,
        tid: TransactionId,
    ) -> StorageResult<Option<RecordId>> {
        let handle = self.handle();
        let page = self
            .pool
            .get_page(&handle, page_no, tid, LockMode::Exclusive)?;
        let mut guard = page.write().unwrap();
        let heap = guard.as_heap_mut().ok_or_else(|| {
            StorageError::Corrupted(format!("{} holds a non-heap page", self.file_name))
        })?;
        match heap.insert_tuple(t) {
            Ok(rid) => Ok(Some(rid)),
            Err(StorageError::PageFull(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl DbFile for HeapFile {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn descriptor(&self) -> &TupleDesc {
        &self.desc
    }

    fn num_pages(&self) -> usize {
        match std::fs::metadata(&self.path) {
            Ok(meta) => (meta.len() / PAGE_SIZE as u64) as usize,
            Err(_) => 0,
        }
    }

    fn read_page(&self, page_no: usize) -> StorageResult<Page> {
        if page_no >= self.num_pages() {
            return Err(StorageError::PageOutOfBounds {
                file: self.file_name.clone(),
                page_no,
            });
        }
        let mut buf = vec![0u8; PAGE_SIZE];
        {
            let mut file = self.file.lock().unwrap();
            file.seek(SeekFrom::Start((page_no * PAGE_SIZE) as u64))?;
            let mut read = 0;
            while read < PAGE_SIZE {
                let n = file.read(&mut buf[read..])?;
                if n == 0 {
                    break; // fractional tail, treat the rest as zeros
                }
                read += n;
            }
        }
        crate::stratum_debug_log!("[HeapFile] {} read page {page_no}", self.file_name);
        Ok(Page::Heap(HeapPage::from_bytes(&buf, &self.desc, page_no)?))
    }

    fn flush_page(&self, page: &mut Page) -> StorageResult<()> {
        fault::trip(FaultSite::HeapFlush)?;
        let heap = page.as_heap().ok_or_else(|| {
            StorageError::Corrupted(format!("{} handed a non-heap page", self.file_name))
        })?;
        let page_no = heap.page_no();
        let bytes = heap.to_bytes();
        self.write_page_at(page_no, &bytes)?;
        page.set_dirty(false);
        crate::stratum_debug_log!("[HeapFile] {} flushed page {page_no}", self.file_name);
        Ok(())
    }

    /// Insert into the first free slot among pages already cached for this
    /// file, else append a new page and insert there.
    fn insert_tuple(&self, t: &mut Tuple, tid: TransactionId) -> StorageResult<()> {
        if t.desc != self.desc || t.values.len() != self.desc.fields.len() {
            return Err(StorageError::SchemaMismatch(format!(
                "tuple schema does not match {}",
                self.file_name
            )));
        }
        loop {
            for page_no in self.pool.cached_page_numbers(&self.file_name) {
                if let Some(rid) = self.try_insert_on(page_no, t, tid)? {
                    t.rid = Some(rid);
                    return Ok(());
                }
            }
            // Every cached page is full (or nothing is cached yet).
            let page_no = self.append_page()?;
            if let Some(rid) = self.try_insert_on(page_no, t, tid)? {
                t.rid = Some(rid);
                return Ok(());
            }
            // Another transaction filled the fresh page first; go around.
        }
    }

    fn delete_tuple(&self, t: &Tuple, tid: TransactionId) -> StorageResult<()> {
        let rid = t
            .rid
            .as_ref()
            .ok_or_else(|| StorageError::InvalidRid("tuple has no record id".to_string()))?;
        let page_no = match rid {
            RecordId::Slot { page_no, .. } => *page_no,
            RecordId::Striped { .. } => {
                return Err(StorageError::InvalidRid(
                    "heap files address tuples by a single slot, got a striped id".to_string(),
                ))
            }
        };
        let handle = self.handle();
        let page = self
            .pool
            .get_page(&handle, page_no, tid, LockMode::Exclusive)?;
        let mut guard = page.write().unwrap();
        let heap = guard.as_heap_mut().ok_or_else(|| {
            StorageError::Corrupted(format!("{} holds a non-heap page", self.file_name))
        })?;
        heap.delete_tuple(rid)
    }

    fn scan(&self, tid: TransactionId) -> StorageResult<TupleStream> {
        let file: Arc<HeapFile> = self.me.upgrade().expect("heap file used outside an Arc");
        Ok(Box::new(HeapScan {
            file,
            tid,
            next_page: 0,
            total_pages: self.num_pages(),
            buffered: VecDeque::new(),
            done: false,
        }))
    }
}

/// Walks the file's pages in ascending order under shared locks, yielding
/// each present tuple in slot order. Tuples are independent copies; the
/// page is not pinned beyond the read that buffered it.
struct HeapScan {
    file: Arc<HeapFile>,
    tid: TransactionId,
    next_page: usize,
    total_pages: usize,
    buffered: VecDeque<Tuple>,
    done: bool,
}

impl Iterator for HeapScan {
    type Item = StorageResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(t) = self.buffered.pop_front() {
                return Some(Ok(t));
            }
            if self.done || self.next_page >= self.total_pages {
                return None;
            }
            let handle = self.file.handle();
            match self
                .file
                .pool
                .get_page(&handle, self.next_page, self.tid, LockMode::Shared)
            {
                Ok(page) => {
                    let guard = page.read().unwrap();
                    if let Some(heap) = guard.as_heap() {
                        self.buffered.extend(heap.iter());
                    }
                    self.next_page += 1;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
