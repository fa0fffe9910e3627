use crate::errors::{StorageError, StorageResult};
use crate::STRING_LENGTH;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of a tuple field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Int,
    Str,
}

impl FieldKind {
    /// Serialized width of one value of this kind, in bytes.
    pub fn width(self) -> usize {
        match self {
            FieldKind::Int => 8,
            FieldKind::Str => STRING_LENGTH,
        }
    }
}

/// A named, typed field of a schema. The qualifier carries the table name
/// when one was specified by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub name: String,
    pub qualifier: Option<String>,
    pub kind: FieldKind,
}

impl FieldType {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        FieldType {
            name: name.to_string(),
            qualifier: None,
            kind,
        }
    }
}

/// The schema of a tuple: an ordered list of fields. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDesc {
    pub fields: Vec<FieldType>,
}

impl TupleDesc {
    pub fn new(fields: Vec<FieldType>) -> Self {
        TupleDesc { fields }
    }

    pub fn single(field: FieldType) -> Self {
        TupleDesc {
            fields: vec![field],
        }
    }

    /// Serialized width of one tuple of this schema. Every tuple of a given
    /// schema occupies exactly this many bytes.
    pub fn bytes_per_tuple(&self) -> usize {
        self.fields.iter().map(|f| f.kind.width()).sum()
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Int(_) => FieldKind::Int,
            Value::Str(_) => FieldKind::Str,
        }
    }

    /// Append the fixed-width little-endian encoding of this value.
    /// Strings longer than [`STRING_LENGTH`] bytes are truncated.
    fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Value::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::Str(s) => {
                let bytes = s.as_bytes();
                let n = bytes.len().min(STRING_LENGTH);
                buf.extend_from_slice(&bytes[..n]);
                buf.resize(buf.len() + (STRING_LENGTH - n), 0);
            }
        }
    }

    /// Decode one value of `kind` from the front of `bytes`. Trailing NUL
    /// padding is stripped from strings.
    fn read_from(bytes: &[u8], kind: FieldKind) -> StorageResult<Value> {
        if bytes.len() < kind.width() {
            return Err(StorageError::Corrupted(format!(
                "need {} bytes for a {kind:?} value, have {}",
                kind.width(),
                bytes.len()
            )));
        }
        match kind {
            FieldKind::Int => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[..8]);
                Ok(Value::Int(i64::from_le_bytes(raw)))
            }
            FieldKind::Str => {
                let raw = &bytes[..STRING_LENGTH];
                let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Ok(Value::Str(String::from_utf8_lossy(&raw[..end]).into_owned()))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// The physical location of a tuple.
///
/// Heap files address a tuple with a single `(page, slot)` pair. Column
/// files stripe a row across one page per column, so a row is addressed by
/// parallel page and slot arrays in field order. Consumers that expect one
/// shape must reject the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordId {
    Slot { page_no: usize, slot: usize },
    Striped { pages: Vec<usize>, slots: Vec<usize> },
}

/// A row value: a schema, the field values, and the record id assigned when
/// the tuple was stored or read.
///
/// Equality compares the schema and the values; the record id is a physical
/// address, not part of the value.
#[derive(Debug, Clone)]
pub struct Tuple {
    pub desc: TupleDesc,
    pub values: Vec<Value>,
    pub rid: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: TupleDesc, values: Vec<Value>) -> Self {
        Tuple {
            desc,
            values,
            rid: None,
        }
    }

    /// Append the fixed-width encoding of every field, in order.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        for value in &self.values {
            value.write_to(buf);
        }
    }

    /// Decode one tuple of schema `desc` from the front of `bytes`.
    pub fn read_from(bytes: &[u8], desc: &TupleDesc) -> StorageResult<Tuple> {
        let mut values = Vec::with_capacity(desc.fields.len());
        let mut offset = 0;
        for field in &desc.fields {
            values.push(Value::read_from(&bytes[offset..], field.kind)?);
            offset += field.kind.width();
        }
        Ok(Tuple::new(desc.clone(), values))
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.values == other.values
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_desc() -> TupleDesc {
        TupleDesc::new(vec![
            FieldType::new("name", FieldKind::Str),
            FieldType::new("age", FieldKind::Int),
        ])
    }

    #[test]
    fn bytes_per_tuple_sums_field_widths() {
        assert_eq!(sample_desc().bytes_per_tuple(), STRING_LENGTH + 8);
    }

    #[test]
    fn codec_round_trip() {
        let desc = sample_desc();
        let t = Tuple::new(
            desc.clone(),
            vec![Value::Str("sam".to_string()), Value::Int(25)],
        );
        let mut buf = Vec::new();
        t.write_to(&mut buf);
        assert_eq!(buf.len(), desc.bytes_per_tuple());

        let back = Tuple::read_from(&buf, &desc).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn short_strings_are_nul_padded_and_stripped() {
        let mut buf = Vec::new();
        Value::Str("mit".to_string()).write_to(&mut buf);
        assert_eq!(buf.len(), STRING_LENGTH);
        assert_eq!(&buf[..3], b"mit");
        assert!(buf[3..].iter().all(|&b| b == 0));

        let back = Value::read_from(&buf, FieldKind::Str).unwrap();
        assert_eq!(back, Value::Str("mit".to_string()));
    }

    #[test]
    fn long_strings_are_truncated() {
        let long = "x".repeat(STRING_LENGTH + 10);
        let mut buf = Vec::new();
        Value::Str(long).write_to(&mut buf);
        assert_eq!(buf.len(), STRING_LENGTH);

        let back = Value::read_from(&buf, FieldKind::Str).unwrap();
        assert_eq!(back, Value::Str("x".repeat(STRING_LENGTH)));
    }

    #[test]
    fn int_values_are_little_endian() {
        let mut buf = Vec::new();
        Value::Int(0x0102_0304).write_to(&mut buf);
        assert_eq!(buf[0], 0x04);
        assert_eq!(buf[3], 0x01);
        assert_eq!(Value::read_from(&buf, FieldKind::Int).unwrap(), Value::Int(0x0102_0304));
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let err = Value::read_from(&[0u8; 4], FieldKind::Int).unwrap_err();
        assert!(matches!(err, StorageError::Corrupted(_)));
    }

    #[test]
    fn equality_ignores_record_id() {
        let desc = sample_desc();
        let mut a = Tuple::new(
            desc.clone(),
            vec![Value::Str("sam".to_string()), Value::Int(25)],
        );
        let b = Tuple::new(desc, vec![Value::Str("sam".to_string()), Value::Int(25)]);
        a.rid = Some(RecordId::Slot { page_no: 3, slot: 7 });
        assert_eq!(a, b);
    }

    #[test]
    fn display_renders_comma_separated_row() {
        let t = Tuple::new(
            sample_desc(),
            vec![Value::Str("sam".to_string()), Value::Int(25)],
        );
        assert_eq!(t.to_string(), "sam,25");
    }
}
