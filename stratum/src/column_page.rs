use crate::errors::{StorageError, StorageResult};
use crate::page::{read_header, slot_capacity, write_header};
use crate::tuple::{FieldType, RecordId, Tuple, TupleDesc};
use crate::{PAGE_HEADER_SIZE, PAGE_SIZE};

/// A slotted page holding values of exactly one column.
///
/// The layout is the same as [`crate::heap_page::HeapPage`], except every
/// stored tuple has a single field and the slot capacity is derived from
/// that one field's width. The page remembers which column it stores.
#[derive(Debug)]
pub struct ColumnPage {
    page_no: usize,
    field: FieldType,
    desc: TupleDesc,
    tuples: Vec<Option<Tuple>>,
    dirty: bool,
}

impl ColumnPage {
    pub fn new(field: FieldType, page_no: usize) -> ColumnPage {
        let capacity = slot_capacity(field.kind.width());
        let desc = TupleDesc::single(field.clone());
        ColumnPage {
            page_no,
            field,
            desc,
            tuples: vec![None; capacity],
            dirty: false,
        }
    }

    pub fn page_no(&self) -> usize {
        self.page_no
    }

    /// The column this page stores.
    pub fn field(&self) -> &FieldType {
        &self.field
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

    /// Place a single-field tuple in the first empty slot, assign its
    /// record id, and mark the page dirty.
    pub fn insert_tuple(&mut self, t: &Tuple) -> StorageResult<RecordId> {
        if t.values.len() != 1 {
            return Err(StorageError::SchemaMismatch(format!(
                "column pages hold one field per tuple, got {}",
                t.values.len()
            )));
        }
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
                    "column pages hold single-slot record ids, got a striped one".to_string(),
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

    /// Non-empty slots in ascending slot order, with record ids set.
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

    pub fn from_bytes(bytes: &[u8], field: &FieldType, page_no: usize) -> StorageResult<ColumnPage> {
        if bytes.len() < PAGE_SIZE {
            return Err(StorageError::Corrupted(format!(
                "page image is {} bytes, expected {PAGE_SIZE}",
                bytes.len()
            )));
        }
        let (stored_capacity, used) = read_header(bytes)?;
        let capacity = slot_capacity(field.kind.width());
        if stored_capacity != 0 && stored_capacity != capacity {
            return Err(StorageError::Corrupted(format!(
                "page {page_no} header claims {stored_capacity} slots, column allows {capacity}"
            )));
        }

        let mut page = ColumnPage::new(field.clone(), page_no);
        let width = field.kind.width();
        for slot in 0..used.min(capacity) {
            let offset = PAGE_HEADER_SIZE + slot * width;
            let mut tuple = Tuple::read_from(&bytes[offset..], &page.desc)?;
            tuple.rid = Some(RecordId::Slot { page_no, slot });
            page.tuples[slot] = Some(tuple);
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{FieldKind, Value};
    use crate::STRING_LENGTH;

    fn name_field() -> FieldType {
        FieldType::new("name", FieldKind::Str)
    }

    fn name_value(s: &str) -> Tuple {
        Tuple::new(
            TupleDesc::single(name_field()),
            vec![Value::Str(s.to_string())],
        )
    }

    #[test]
    fn capacity_uses_only_the_column_width() {
        let strings = ColumnPage::new(name_field(), 0);
        assert_eq!(
            strings.slot_count(),
            (PAGE_SIZE - PAGE_HEADER_SIZE) / STRING_LENGTH
        );

        let ints = ColumnPage::new(FieldType::new("age", FieldKind::Int), 0);
        assert_eq!(ints.slot_count(), (PAGE_SIZE - PAGE_HEADER_SIZE) / 8);
    }

    #[test]
    fn multi_field_tuples_are_rejected() {
        let mut page = ColumnPage::new(name_field(), 0);
        let wide = Tuple::new(
            TupleDesc::new(vec![name_field(), FieldType::new("age", FieldKind::Int)]),
            vec![Value::Str("sam".to_string()), Value::Int(25)],
        );
        assert!(matches!(
            page.insert_tuple(&wide).unwrap_err(),
            StorageError::SchemaMismatch(_)
        ));
    }

    #[test]
    fn insert_delete_round_trip() {
        let mut page = ColumnPage::new(name_field(), 1);
        let r1 = page.insert_tuple(&name_value("sam")).unwrap();
        page.insert_tuple(&name_value("mark")).unwrap();
        assert_eq!(r1, RecordId::Slot { page_no: 1, slot: 0 });

        page.delete_tuple(&r1).unwrap();
        let left: Vec<Tuple> = page.iter().collect();
        assert_eq!(left, vec![name_value("mark")]);
    }

    #[test]
    fn binary_round_trip_keeps_the_column() {
        let mut page = ColumnPage::new(name_field(), 5);
        page.insert_tuple(&name_value("sam")).unwrap();
        page.insert_tuple(&name_value("mark")).unwrap();

        let back = ColumnPage::from_bytes(&page.to_bytes(), &name_field(), 5).unwrap();
        assert_eq!(back.field(), &name_field());
        assert_eq!(
            back.iter().collect::<Vec<_>>(),
            page.iter().collect::<Vec<_>>()
        );
        assert_eq!(back.to_bytes().len(), PAGE_SIZE);
    }
}
