//! Typed columnar value containers
//!
//! `Column` is a closed sum type with one variant per logical type. Leaf
//! variants store values in their native encoding; composite variants hold
//! shared (`Arc`) children and are mutated copy-on-write, so a child that is
//! also referenced from a block or another composite is never changed
//! underneath its other holders.

mod composite;
mod dictionary;
mod dynamic;
mod scalar;

pub use dictionary::DictionaryIndex;
pub use scalar::HostScalar;

pub(crate) use dictionary::merge_into_dictionary;

use std::sync::Arc;

use crate::data::{Uuid, Value};
use crate::types::ColumnType;
use crate::{ChexError, Result};

/// Shared reference to a column
pub type ColumnRef = Arc<Column>;

/// Typed, append-only, indexable column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
    Bool(Vec<bool>),
    /// Days since epoch
    Date(Vec<u16>),
    /// Seconds since epoch
    DateTime {
        timezone: Option<String>,
        data: Vec<u32>,
    },
    /// Ticks at 10^-precision seconds
    DateTime64 {
        precision: u8,
        timezone: Option<String>,
        data: Vec<i64>,
    },
    /// Pre-scaled mantissas
    Decimal {
        precision: u8,
        scale: u8,
        data: Vec<i128>,
    },
    Uuid(Vec<Uuid>),
    /// `nulls[i] != 0` marks row i as null; `nested` still holds a placeholder there
    Nullable {
        nested: ColumnRef,
        nulls: Vec<u8>,
    },
    /// Row i spans `nested[offsets[i-1]..offsets[i]]`, with `offsets[-1] = 0`
    Array {
        offsets: Vec<u64>,
        nested: ColumnRef,
    },
    Tuple(Vec<ColumnRef>),
    /// Stored as `Array(Tuple(K, V))`
    Map(ColumnRef),
    /// Unique dictionary entries plus one key per row
    LowCardinality {
        dictionary: ColumnRef,
        keys: Vec<u32>,
        index: DictionaryIndex,
    },
}

impl Column {
    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            Column::UInt8(d) => d.len(),
            Column::UInt16(d) => d.len(),
            Column::UInt32(d) => d.len(),
            Column::UInt64(d) => d.len(),
            Column::Int8(d) => d.len(),
            Column::Int16(d) => d.len(),
            Column::Int32(d) => d.len(),
            Column::Int64(d) => d.len(),
            Column::Float32(d) => d.len(),
            Column::Float64(d) => d.len(),
            Column::String(d) => d.len(),
            Column::Bool(d) => d.len(),
            Column::Date(d) => d.len(),
            Column::DateTime { data, .. } => data.len(),
            Column::DateTime64 { data, .. } => data.len(),
            Column::Decimal { data, .. } => data.len(),
            Column::Uuid(d) => d.len(),
            Column::Nullable { nulls, .. } => nulls.len(),
            Column::Array { offsets, .. } => offsets.len(),
            Column::Tuple(elements) => elements.first().map_or(0, |e| e.len()),
            Column::Map(inner) => inner.len(),
            Column::LowCardinality { keys, .. } => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical type, derived from the column's structure
    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::UInt8(_) => ColumnType::UInt8,
            Column::UInt16(_) => ColumnType::UInt16,
            Column::UInt32(_) => ColumnType::UInt32,
            Column::UInt64(_) => ColumnType::UInt64,
            Column::Int8(_) => ColumnType::Int8,
            Column::Int16(_) => ColumnType::Int16,
            Column::Int32(_) => ColumnType::Int32,
            Column::Int64(_) => ColumnType::Int64,
            Column::Float32(_) => ColumnType::Float32,
            Column::Float64(_) => ColumnType::Float64,
            Column::String(_) => ColumnType::String,
            Column::Bool(_) => ColumnType::Bool,
            Column::Date(_) => ColumnType::Date,
            Column::DateTime { timezone, .. } => ColumnType::DateTime {
                timezone: timezone.clone(),
            },
            Column::DateTime64 { precision, timezone, .. } => ColumnType::DateTime64 {
                precision: *precision,
                timezone: timezone.clone(),
            },
            Column::Decimal { precision, scale, .. } => ColumnType::Decimal {
                precision: *precision,
                scale: *scale,
            },
            Column::Uuid(_) => ColumnType::Uuid,
            Column::Nullable { nested, .. } => ColumnType::Nullable(Box::new(nested.column_type())),
            Column::Array { nested, .. } => ColumnType::Array(Box::new(nested.column_type())),
            Column::Tuple(elements) => {
                ColumnType::Tuple(elements.iter().map(|e| e.column_type()).collect())
            }
            Column::Map(inner) => match inner.column_type() {
                ColumnType::Array(item) => match *item {
                    ColumnType::Tuple(mut kv) if kv.len() == 2 => {
                        let value = kv.pop().unwrap_or(ColumnType::String);
                        let key = kv.pop().unwrap_or(ColumnType::String);
                        ColumnType::Map(Box::new(key), Box::new(value))
                    }
                    other => ColumnType::Array(Box::new(other)),
                },
                other => other,
            },
            Column::LowCardinality { dictionary, .. } => {
                ColumnType::LowCardinality(Box::new(dictionary.column_type()))
            }
        }
    }

    /// Empty column of the same logical type
    pub fn clone_empty(&self) -> Column {
        self.column_type().create_column()
    }

    /// Read one row as a host value
    pub fn at(&self, index: usize) -> Result<Value> {
        let size = self.len();
        if index >= size {
            return Err(ChexError::Index { index, size });
        }
        Ok(crate::decode::decode_cell(self, index))
    }

    /// New column holding rows `[start, start + count)`
    pub fn slice(&self, start: usize, count: usize) -> Result<Column> {
        let size = self.len();
        match start.checked_add(count) {
            Some(end) if end <= size => Ok(self.slice_range(start, end)),
            _ => Err(ChexError::Range {
                end: (start as u64).saturating_add(count as u64),
                size,
            }),
        }
    }

    /// Append all rows of a column of the same logical type
    pub fn append_column(&mut self, other: &Column) -> Result<()> {
        let (own, theirs) = (self.column_type(), other.column_type());
        if own != theirs {
            return Err(ChexError::type_mismatch(own, theirs));
        }
        self.extend_from(other)
    }

    /// Check the structural invariants that decoding and export rely on:
    /// null maps and element columns match their row counts, array offsets
    /// are non-decreasing within the nested column, map storage is
    /// `Array(Tuple(K, V))` and dictionary keys point into the dictionary.
    ///
    /// Columns built through this crate always pass; columns assembled
    /// directly from their parts (for example by a transport) may not.
    pub fn validate(&self) -> Result<()> {
        match self {
            Column::Nullable { nested, nulls } => {
                if nested.len() != nulls.len() {
                    return Err(ChexError::LengthMismatch {
                        what: "nullable values and null flags",
                        expected: nulls.len(),
                        actual: nested.len(),
                    });
                }
                nested.validate()
            }
            Column::Array { offsets, nested } => {
                composite::validate_offsets(offsets, nested.len())?;
                nested.validate()
            }
            Column::Tuple(elements) => {
                let expected = self.len();
                if let Some(other) = elements.iter().find(|e| e.len() != expected) {
                    return Err(ChexError::LengthMismatch {
                        what: "tuple element columns",
                        expected,
                        actual: other.len(),
                    });
                }
                elements.iter().try_for_each(|e| e.validate())
            }
            Column::Map(inner) => match inner.as_ref() {
                Column::Array { nested, .. } if matches!(nested.as_ref(), Column::Tuple(kv) if kv.len() == 2) => {
                    inner.validate()
                }
                other => Err(ChexError::type_mismatch("Array(Tuple(K, V))", other.column_type())),
            },
            Column::LowCardinality { dictionary, keys, .. } => {
                let size = dictionary.len();
                if let Some(&key) = keys.iter().find(|&&k| k as usize >= size) {
                    return Err(ChexError::Range { end: key as u64, size });
                }
                dictionary.validate()
            }
            _ => Ok(()),
        }
    }

    /// Bounds of array row `row` within the nested column
    pub(crate) fn array_bounds(offsets: &[u64], row: usize) -> (usize, usize) {
        let start = if row == 0 { 0 } else { offsets[row - 1] };
        (start as usize, offsets[row] as usize)
    }

    /// Slice without bounds checking against `len()`; callers guarantee `start <= end <= len()`
    pub(crate) fn slice_range(&self, start: usize, end: usize) -> Column {
        match self {
            Column::UInt8(d) => Column::UInt8(d[start..end].to_vec()),
            Column::UInt16(d) => Column::UInt16(d[start..end].to_vec()),
            Column::UInt32(d) => Column::UInt32(d[start..end].to_vec()),
            Column::UInt64(d) => Column::UInt64(d[start..end].to_vec()),
            Column::Int8(d) => Column::Int8(d[start..end].to_vec()),
            Column::Int16(d) => Column::Int16(d[start..end].to_vec()),
            Column::Int32(d) => Column::Int32(d[start..end].to_vec()),
            Column::Int64(d) => Column::Int64(d[start..end].to_vec()),
            Column::Float32(d) => Column::Float32(d[start..end].to_vec()),
            Column::Float64(d) => Column::Float64(d[start..end].to_vec()),
            Column::String(d) => Column::String(d[start..end].to_vec()),
            Column::Bool(d) => Column::Bool(d[start..end].to_vec()),
            Column::Date(d) => Column::Date(d[start..end].to_vec()),
            Column::DateTime { timezone, data } => Column::DateTime {
                timezone: timezone.clone(),
                data: data[start..end].to_vec(),
            },
            Column::DateTime64 { precision, timezone, data } => Column::DateTime64 {
                precision: *precision,
                timezone: timezone.clone(),
                data: data[start..end].to_vec(),
            },
            Column::Decimal { precision, scale, data } => Column::Decimal {
                precision: *precision,
                scale: *scale,
                data: data[start..end].to_vec(),
            },
            Column::Uuid(d) => Column::Uuid(d[start..end].to_vec()),
            Column::Nullable { nested, nulls } => Column::Nullable {
                nested: Arc::new(nested.slice_range(start, end)),
                nulls: nulls[start..end].to_vec(),
            },
            Column::Array { offsets, nested } => {
                let base = if start == 0 { 0 } else { offsets[start - 1] };
                let last = if end == 0 { 0 } else { offsets[end - 1] };
                Column::Array {
                    offsets: offsets[start..end].iter().map(|o| o - base).collect(),
                    nested: Arc::new(nested.slice_range(base as usize, last.max(base) as usize)),
                }
            }
            Column::Tuple(elements) => Column::Tuple(
                elements
                    .iter()
                    .map(|e| Arc::new(e.slice_range(start, end)))
                    .collect(),
            ),
            Column::Map(inner) => Column::Map(Arc::new(inner.slice_range(start, end))),
            // The dictionary is shared, only the keys are cut
            Column::LowCardinality { dictionary, keys, .. } => Column::LowCardinality {
                dictionary: Arc::clone(dictionary),
                keys: keys[start..end].to_vec(),
                index: DictionaryIndex::default(),
            },
        }
    }

    /// Extend with the rows of `other`, which must have the same logical type
    pub(crate) fn extend_from(&mut self, other: &Column) -> Result<()> {
        match (self, other) {
            (Column::UInt8(a), Column::UInt8(b)) => a.extend_from_slice(b),
            (Column::UInt16(a), Column::UInt16(b)) => a.extend_from_slice(b),
            (Column::UInt32(a), Column::UInt32(b)) => a.extend_from_slice(b),
            (Column::UInt64(a), Column::UInt64(b)) => a.extend_from_slice(b),
            (Column::Int8(a), Column::Int8(b)) => a.extend_from_slice(b),
            (Column::Int16(a), Column::Int16(b)) => a.extend_from_slice(b),
            (Column::Int32(a), Column::Int32(b)) => a.extend_from_slice(b),
            (Column::Int64(a), Column::Int64(b)) => a.extend_from_slice(b),
            (Column::Float32(a), Column::Float32(b)) => a.extend_from_slice(b),
            (Column::Float64(a), Column::Float64(b)) => a.extend_from_slice(b),
            (Column::String(a), Column::String(b)) => a.extend_from_slice(b),
            (Column::Bool(a), Column::Bool(b)) => a.extend_from_slice(b),
            (Column::Date(a), Column::Date(b)) => a.extend_from_slice(b),
            (Column::DateTime { data: a, .. }, Column::DateTime { data: b, .. }) => {
                a.extend_from_slice(b)
            }
            (Column::DateTime64 { data: a, .. }, Column::DateTime64 { data: b, .. }) => {
                a.extend_from_slice(b)
            }
            (Column::Decimal { data: a, .. }, Column::Decimal { data: b, .. }) => {
                a.extend_from_slice(b)
            }
            (Column::Uuid(a), Column::Uuid(b)) => a.extend_from_slice(b),
            (
                Column::Nullable { nested, nulls },
                Column::Nullable { nested: other_nested, nulls: other_nulls },
            ) => {
                Arc::make_mut(nested).extend_from(other_nested)?;
                nulls.extend_from_slice(other_nulls);
            }
            (
                Column::Array { offsets, nested },
                Column::Array { offsets: other_offsets, nested: other_nested },
            ) => {
                let base = offsets.last().copied().unwrap_or(0);
                let used = other_offsets.last().copied().unwrap_or(0) as usize;
                let target = Arc::make_mut(nested);
                if used == other_nested.len() {
                    target.extend_from(other_nested)?;
                } else {
                    target.extend_from(&other_nested.slice_range(0, used))?;
                }
                offsets.extend(other_offsets.iter().map(|o| o + base));
            }
            (Column::Tuple(elements), Column::Tuple(other_elements)) => {
                if elements.len() != other_elements.len() {
                    return Err(ChexError::ArityMismatch {
                        expected: elements.len(),
                        actual: other_elements.len(),
                    });
                }
                for (element, other_element) in elements.iter_mut().zip(other_elements) {
                    Arc::make_mut(element).extend_from(other_element)?;
                }
            }
            (Column::Map(inner), Column::Map(other_inner)) => {
                Arc::make_mut(inner).extend_from(other_inner)?;
            }
            (Column::LowCardinality { dictionary, keys, index }, other @ Column::LowCardinality { .. }) => {
                merge_into_dictionary(dictionary, index, keys, other)?;
            }
            (this, other) => {
                return Err(ChexError::type_mismatch(this.column_type(), other.column_type()))
            }
        }
        Ok(())
    }

    /// Push one placeholder row (zero, empty string, empty array, NULL for Nullable)
    pub(crate) fn push_default(&mut self) -> Result<()> {
        match self {
            Column::UInt8(d) => d.push(0),
            Column::UInt16(d) => d.push(0),
            Column::UInt32(d) => d.push(0),
            Column::UInt64(d) => d.push(0),
            Column::Int8(d) => d.push(0),
            Column::Int16(d) => d.push(0),
            Column::Int32(d) => d.push(0),
            Column::Int64(d) => d.push(0),
            Column::Float32(d) => d.push(0.0),
            Column::Float64(d) => d.push(0.0),
            Column::String(d) => d.push(String::new()),
            Column::Bool(d) => d.push(false),
            Column::Date(d) => d.push(0),
            Column::DateTime { data, .. } => data.push(0),
            Column::DateTime64 { data, .. } => data.push(0),
            Column::Decimal { data, .. } => data.push(0),
            Column::Uuid(d) => d.push(Uuid::default()),
            Column::Nullable { nested, nulls } => {
                Arc::make_mut(nested).push_default()?;
                nulls.push(1);
            }
            Column::Array { offsets, .. } => {
                let last = offsets.last().copied().unwrap_or(0);
                offsets.push(last);
            }
            Column::Tuple(elements) => {
                for element in elements.iter_mut() {
                    Arc::make_mut(element).push_default()?;
                }
            }
            Column::Map(inner) => Arc::make_mut(inner).push_default()?,
            Column::LowCardinality { dictionary, keys, index } => {
                let mut staged = dictionary.clone_empty();
                staged.push_default()?;
                merge_into_dictionary(dictionary, index, keys, &staged)?;
            }
        }
        Ok(())
    }

    /// Append a byte encoding of row `row` that is equal for equal values.
    /// Used as the dictionary key for LowCardinality deduplication.
    pub(crate) fn row_key(&self, row: usize, out: &mut Vec<u8>) {
        match self {
            Column::UInt8(d) => out.push(d[row]),
            Column::UInt16(d) => out.extend_from_slice(&d[row].to_le_bytes()),
            Column::UInt32(d) => out.extend_from_slice(&d[row].to_le_bytes()),
            Column::UInt64(d) => out.extend_from_slice(&d[row].to_le_bytes()),
            Column::Int8(d) => out.extend_from_slice(&d[row].to_le_bytes()),
            Column::Int16(d) => out.extend_from_slice(&d[row].to_le_bytes()),
            Column::Int32(d) => out.extend_from_slice(&d[row].to_le_bytes()),
            Column::Int64(d) => out.extend_from_slice(&d[row].to_le_bytes()),
            Column::Float32(d) => out.extend_from_slice(&d[row].to_bits().to_le_bytes()),
            Column::Float64(d) => out.extend_from_slice(&d[row].to_bits().to_le_bytes()),
            Column::String(d) => {
                out.extend_from_slice(&(d[row].len() as u64).to_le_bytes());
                out.extend_from_slice(d[row].as_bytes());
            }
            Column::Bool(d) => out.push(d[row] as u8),
            Column::Date(d) => out.extend_from_slice(&d[row].to_le_bytes()),
            Column::DateTime { data, .. } => out.extend_from_slice(&data[row].to_le_bytes()),
            Column::DateTime64 { data, .. } => out.extend_from_slice(&data[row].to_le_bytes()),
            Column::Decimal { data, .. } => out.extend_from_slice(&data[row].to_le_bytes()),
            Column::Uuid(d) => {
                out.extend_from_slice(&d[row].high.to_le_bytes());
                out.extend_from_slice(&d[row].low.to_le_bytes());
            }
            Column::Nullable { nested, nulls } => {
                if nulls[row] != 0 {
                    out.push(1);
                } else {
                    out.push(0);
                    nested.row_key(row, out);
                }
            }
            Column::Array { offsets, nested } => {
                let (start, end) = Column::array_bounds(offsets, row);
                out.extend_from_slice(&((end - start) as u64).to_le_bytes());
                for i in start..end {
                    nested.row_key(i, out);
                }
            }
            Column::Tuple(elements) => {
                for element in elements {
                    element.row_key(row, out);
                }
            }
            Column::Map(inner) => inner.row_key(row, out),
            Column::LowCardinality { dictionary, keys, .. } => {
                dictionary.row_key(keys[row] as usize, out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn strings(values: &[&str]) -> Column {
        Column::String(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_len_and_at() {
        let col = Column::UInt16(vec![1, 2, 3]);
        assert_eq!(col.len(), 3);
        assert_eq!(col.at(2).unwrap(), Value::UInt64(3));
        assert!(matches!(col.at(3), Err(ChexError::Index { index: 3, size: 3 })));
    }

    #[test]
    fn test_slice_leaf() {
        let col = strings(&["a", "b", "c", "d"]);
        assert_eq!(col.slice(1, 2).unwrap(), strings(&["b", "c"]));
        assert_eq!(col.slice(4, 0).unwrap().len(), 0);
        assert!(matches!(col.slice(3, 2), Err(ChexError::Range { end: 5, size: 4 })));
        assert!(matches!(col.slice(usize::MAX, 2), Err(ChexError::Range { .. })));
    }

    #[test]
    fn test_slice_array_rebases_offsets() {
        let col = Column::Array {
            offsets: vec![2, 2, 5],
            nested: Arc::new(strings(&["a", "b", "c", "d", "e"])),
        };
        let tail = col.slice(1, 2).unwrap();
        match &tail {
            Column::Array { offsets, nested } => {
                assert_eq!(offsets, &vec![0, 3]);
                assert_eq!(nested.as_ref(), &strings(&["c", "d", "e"]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_slice_low_cardinality_shares_dictionary() {
        let dictionary = Arc::new(strings(&["x", "y"]));
        let col = Column::LowCardinality {
            dictionary: Arc::clone(&dictionary),
            keys: vec![0, 1, 1, 0],
            index: DictionaryIndex::default(),
        };
        match col.slice(1, 2).unwrap() {
            Column::LowCardinality { dictionary: d, keys, .. } => {
                assert!(Arc::ptr_eq(&d, &dictionary));
                assert_eq!(keys, vec![1, 1]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_append_column_checks_type() {
        let mut col = Column::UInt64(vec![1]);
        col.append_column(&Column::UInt64(vec![2, 3])).unwrap();
        assert_eq!(col, Column::UInt64(vec![1, 2, 3]));
        assert!(matches!(
            col.append_column(&Column::Int64(vec![4])),
            Err(ChexError::TypeMismatch { .. })
        ));
        assert_eq!(col.len(), 3);
    }

    #[test]
    fn test_append_array_column_shifts_offsets() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("Array(UInt8)").unwrap();
        let other = Column::Array { offsets: vec![1, 3], nested: Arc::new(Column::UInt8(vec![7, 8, 9])) };
        col.append_column(&other).unwrap();
        col.append_column(&other).unwrap();
        match col {
            Column::Array { offsets, nested } => {
                assert_eq!(offsets, vec![1, 3, 4, 6]);
                assert_eq!(nested.len(), 6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_copy_on_write_children() {
        let shared = Arc::new(Column::Int32(vec![1]));
        let mut col = Column::Nullable { nested: Arc::clone(&shared), nulls: vec![0] };
        col.append_column(&Column::Nullable { nested: Arc::new(Column::Int32(vec![2])), nulls: vec![1] })
            .unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn test_validate_rejects_malformed_parts() {
        let registry = TypeRegistry::new();
        let mut good = registry.create("Array(LowCardinality(String))").unwrap();
        good.append_value(&Value::Array(vec![Value::from("a"), Value::from("b")])).unwrap();
        assert!(good.validate().is_ok());

        let decreasing = Column::Array { offsets: vec![2, 1], nested: Arc::new(strings(&["a", "b"])) };
        assert!(matches!(decreasing.validate(), Err(ChexError::Monotonicity { index: 1, .. })));

        let past_end = Column::Array { offsets: vec![3], nested: Arc::new(strings(&["a"])) };
        assert!(matches!(past_end.validate(), Err(ChexError::Range { end: 3, size: 1 })));

        let bad_key = Column::LowCardinality {
            dictionary: Arc::new(strings(&["x"])),
            keys: vec![0, 4],
            index: DictionaryIndex::default(),
        };
        assert!(matches!(bad_key.validate(), Err(ChexError::Range { end: 4, size: 1 })));

        let short_nulls = Column::Nullable { nested: Arc::new(Column::UInt8(vec![1, 2])), nulls: vec![0] };
        assert!(matches!(short_nulls.validate(), Err(ChexError::LengthMismatch { .. })));

        let ragged = Column::Tuple(vec![Arc::new(Column::UInt8(vec![1])), Arc::new(strings(&[]))]);
        assert!(matches!(ragged.validate(), Err(ChexError::LengthMismatch { .. })));

        let bad_map = Column::Map(Arc::new(Column::UInt8(vec![])));
        assert!(matches!(bad_map.validate(), Err(ChexError::TypeMismatch { .. })));
    }

    #[test]
    fn test_map_column_type() {
        let registry = TypeRegistry::new();
        let col = registry.create("Map(String, Nullable(Int64))").unwrap();
        assert_eq!(col.column_type().to_string(), "Map(String, Nullable(Int64))");
    }
}
