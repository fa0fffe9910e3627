use crate::errors::{StorageError, StorageResult};
use crate::page::{read_header, slot_capacity, write_header};
use crate::tuple::{RecordId, Tuple, TupleDesc};
use crate::{PAGE_HEADER_SIZE, PAGE_SIZE};

/// A slotted page of full rows.
///
/// Every tuple of the page's schema occupies the same number of bytes, so
/// the slot capacity is fixed by the schema. Slots hold `Option<Tuple>`;
/// free slots may appear between used ones after deletions. Used slots are
/// re-packed to the left when the page is serialized, which is safe because
/// dirty pages are never evicted and record ids are only consulted while
/// the page is in memory.
#[derive(Debug)]
pub struct HeapPage {
    page_no: usize,
    desc: TupleDesc,
    tuples: Vec<Option<Tuple>>,
    dirty: bool,
}

impl HeapPage {
    pub fn new(desc: &TupleDesc, page_no: usize) -> HeapPage {
        let capacity = slot_capacity(desc.bytes_per_tuple());
        HeapPage {
            page_no,
            desc: desc.clone(),
            tuples: vec![None; capacity],
            dirty: false,
        }
    }

    pub fn page_no(&self) -> usize {
        self.page_no
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn slot_count(&self) -> usize {
        self.tuples.len()
    }

    pub fn used_slots(&self) -> usize {
        self.tuples.iter().filter(|t| t.is_some()).count()
    }

    /// Place the tuple in the first empty slot, assign its record id, and
    /// mark the page dirty. Fails with [`StorageError::PageFull`] when no
    /// slot is free.
    pub fn insert_tuple(&mut self, t: &Tuple) -> StorageResult<RecordId> {
        for (slot, cell) in self.tuples.iter_mut().enumerate() {
            if cell.is_none() {
                let rid = RecordId::Slot {
                    page_no: self.page_no,
                    slot,
                };
                let mut stored = t.clone();
                stored.rid = Some(rid.clone());
                *cell = Some(stored);
                self.dirty = true;
                return Ok(rid);
            }
        }
        Err(StorageError::PageFull(self.page_no))
    }

    /// Remove the tuple whose stored record id matches `rid`.
    pub fn delete_tuple(&mut self, rid: &RecordId) -> StorageResult<()> {
        let (page_no, slot) = match rid {
            RecordId::Slot { page_no, slot } => (*page_no, *slot),
            RecordId::Striped { .. } => {
                return Err(StorageError::InvalidRid(
                    "heap pages hold single-slot record ids, got a striped one".to_string(),
                ))
            }
        };
        if slot >= self.tuples.len() {
            return Err(StorageError::BadSlot {
                page_no: self.page_no,
                slot,
            });
        }
        if page_no != self.page_no {
            return Err(StorageError::WrongPage {
                requested: page_no,
                actual: self.page_no,
            });
        }
        for cell in self.tuples.iter_mut() {
            if let Some(t) = cell {
                if t.rid.as_ref() == Some(rid) {
                    *cell = None;
                    self.dirty = true;
                    return Ok(());
                }
            }
        }
        Err(StorageError::TupleNotFound {
            page_no: self.page_no,
        })
    }

    /// Non-empty slots in ascending slot order. Every yielded tuple carries
    /// its record id.
    pub fn iter(&self) -> impl Iterator<Item = Tuple> + '_ {
        self.tuples.iter().flatten().cloned()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PAGE_SIZE);
        write_header(&mut buf, self.tuples.len(), self.used_slots());
        for tuple in self.tuples.iter().flatten() {
            tuple.write_to(&mut buf);
        }
        buf.resize(PAGE_SIZE, 0);
        buf
    }

    /// Materialize a page from its on-disk image. The `used` tuples are
    /// packed at the front of the payload; each gets the record id of the
    /// slot it lands in.
    pub fn from_bytes(bytes: &[u8], desc: &TupleDesc, page_no: usize) -> StorageResult<HeapPage> {
        if bytes.len() < PAGE_SIZE {
            return Err(StorageError::Corrupted(format!(
                "page image is {} bytes, expected {PAGE_SIZE}",
                bytes.len()
            )));
        }
        let (stored_capacity, used) = read_header(bytes)?;
        let capacity = slot_capacity(desc.bytes_per_tuple());
        if stored_capacity != 0 && stored_capacity != capacity {
            return Err(StorageError::Corrupted(format!(
                "page {page_no} header claims {stored_capacity} slots, schema allows {capacity}"
            )));
        }

        let mut page = HeapPage::new(desc, page_no);
        let width = desc.bytes_per_tuple();
        for slot in 0..used.min(capacity) {
            let offset = PAGE_HEADER_SIZE + slot * width;
            let mut tuple = Tuple::read_from(&bytes[offset..], desc)?;
            tuple.rid = Some(RecordId::Slot { page_no, slot });
            page.tuples[slot] = Some(tuple);
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{FieldKind, FieldType, Value};

    fn sample_desc() -> TupleDesc {
        TupleDesc::new(vec![
            FieldType::new("name", FieldKind::Str),
            FieldType::new("age", FieldKind::Int),
        ])
    }

    fn row(name: &str, age: i64) -> Tuple {
        Tuple::new(
            sample_desc(),
            vec![Value::Str(name.to_string()), Value::Int(age)],
        )
    }

    #[test]
    fn insert_assigns_ascending_slots() {
        let mut page = HeapPage::new(&sample_desc(), 0);
        let r1 = page.insert_tuple(&row("sam", 25)).unwrap();
        let r2 = page.insert_tuple(&row("george jones", 999)).unwrap();
        assert_eq!(r1, RecordId::Slot { page_no: 0, slot: 0 });
        assert_eq!(r2, RecordId::Slot { page_no: 0, slot: 1 });
        assert!(page.is_dirty());
        assert_eq!(page.used_slots(), 2);
    }

    #[test]
    fn full_page_rejects_insert() {
        let mut page = HeapPage::new(&sample_desc(), 0);
        for i in 0..page.slot_count() {
            page.insert_tuple(&row("x", i as i64)).unwrap();
        }
        assert!(matches!(
            page.insert_tuple(&row("overflow", 0)).unwrap_err(),
            StorageError::PageFull(0)
        ));
    }

    #[test]
    fn delete_reuses_the_freed_slot() {
        let mut page = HeapPage::new(&sample_desc(), 0);
        let r1 = page.insert_tuple(&row("sam", 25)).unwrap();
        page.insert_tuple(&row("mark", 50)).unwrap();
        page.delete_tuple(&r1).unwrap();
        assert_eq!(page.used_slots(), 1);

        let r3 = page.insert_tuple(&row("ann", 30)).unwrap();
        assert_eq!(r3, RecordId::Slot { page_no: 0, slot: 0 });
    }

    #[test]
    fn delete_validates_the_record_id() {
        let mut page = HeapPage::new(&sample_desc(), 3);
        let rid = page.insert_tuple(&row("sam", 25)).unwrap();

        let bad_slot = RecordId::Slot {
            page_no: 3,
            slot: page.slot_count(),
        };
        assert!(matches!(
            page.delete_tuple(&bad_slot).unwrap_err(),
            StorageError::BadSlot { .. }
        ));

        let wrong_page = RecordId::Slot { page_no: 4, slot: 0 };
        assert!(matches!(
            page.delete_tuple(&wrong_page).unwrap_err(),
            StorageError::WrongPage { requested: 4, actual: 3 }
        ));

        page.delete_tuple(&rid).unwrap();
        assert!(matches!(
            page.delete_tuple(&rid).unwrap_err(),
            StorageError::TupleNotFound { page_no: 3 }
        ));
    }

    #[test]
    fn striped_record_id_is_rejected() {
        let mut page = HeapPage::new(&sample_desc(), 0);
        let striped = RecordId::Striped {
            pages: vec![0],
            slots: vec![0],
        };
        assert!(matches!(
            page.delete_tuple(&striped).unwrap_err(),
            StorageError::InvalidRid(_)
        ));
    }

    #[test]
    fn iter_skips_holes_and_keeps_slot_order() {
        let mut page = HeapPage::new(&sample_desc(), 0);
        page.insert_tuple(&row("a", 1)).unwrap();
        let r2 = page.insert_tuple(&row("b", 2)).unwrap();
        page.insert_tuple(&row("c", 3)).unwrap();
        page.delete_tuple(&r2).unwrap();

        let names: Vec<Tuple> = page.iter().collect();
        assert_eq!(names, vec![row("a", 1), row("c", 3)]);
        assert!(names.iter().all(|t| t.rid.is_some()));
    }

    #[test]
    fn serialized_page_is_exactly_one_page() {
        let mut page = HeapPage::new(&sample_desc(), 0);
        assert_eq!(page.to_bytes().len(), PAGE_SIZE);
        page.insert_tuple(&row("sam", 25)).unwrap();
        assert_eq!(page.to_bytes().len(), PAGE_SIZE);
    }

    #[test]
    fn binary_round_trip_for_packed_pages() {
        let mut page = HeapPage::new(&sample_desc(), 2);
        page.insert_tuple(&row("sam", 25)).unwrap();
        page.insert_tuple(&row("george jones", 999)).unwrap();

        let back = HeapPage::from_bytes(&page.to_bytes(), &sample_desc(), 2).unwrap();
        assert_eq!(back.slot_count(), page.slot_count());
        assert_eq!(
            back.iter().collect::<Vec<_>>(),
            page.iter().collect::<Vec<_>>()
        );
        assert!(!back.is_dirty());
    }

    #[test]
    fn all_zero_page_reads_as_empty() {
        let page = HeapPage::from_bytes(&vec![0u8; PAGE_SIZE], &sample_desc(), 0).unwrap();
        assert_eq!(page.used_slots(), 0);
    }
}
