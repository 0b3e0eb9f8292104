//! Composite column builders
//!
//! Each builder validates all of its inputs before the first mutation, so a
//! rejected call leaves the target column exactly as it was.

use std::sync::Arc;

use super::{merge_into_dictionary, Column};
use crate::{ChexError, Result};

/// Check that `offsets` are non-decreasing and stay within `size` nested rows
pub(super) fn validate_offsets(offsets: &[u64], size: usize) -> Result<()> {
    let mut previous = 0u64;
    for (index, &offset) in offsets.iter().enumerate() {
        if offset < previous {
            return Err(ChexError::Monotonicity { index, offset, previous });
        }
        if offset > size as u64 {
            return Err(ChexError::Range { end: offset, size });
        }
        previous = offset;
    }
    Ok(())
}

fn check_same_type(target: &Column, source: &Column) -> Result<()> {
    let (expected, actual) = (target.column_type(), source.column_type());
    if expected != actual {
        return Err(ChexError::type_mismatch(expected, actual));
    }
    Ok(())
}

impl Column {
    /// Append one array row per entry of `offsets`, taking row i from
    /// `nested[offsets[i-1]..offsets[i]]` (with `offsets[-1] = 0`).
    ///
    /// Nested rows beyond the last offset are ignored.
    pub fn array_append_from_column(&mut self, nested: &Column, offsets: &[u64]) -> Result<()> {
        let (own_offsets, own_nested) = match self {
            Column::Array { offsets, nested } => (offsets, nested),
            other => return Err(ChexError::type_mismatch("Array", other.column_type())),
        };
        validate_offsets(offsets, nested.len())?;
        check_same_type(own_nested, nested)?;

        let used = offsets.last().copied().unwrap_or(0) as usize;
        let target = Arc::make_mut(own_nested);
        let base = target.len() as u64;
        // Consecutive row slices are contiguous, so they go in as one range
        if used == nested.len() {
            target.extend_from(nested)?;
        } else {
            target.extend_from(&nested.slice_range(0, used))?;
        }
        own_offsets.extend(offsets.iter().map(|o| base + o));
        log::trace!("appended {} array rows over {} nested values", offsets.len(), used);
        Ok(())
    }

    /// Append one row per index across equally-sized element columns
    pub fn tuple_append_from_columns(&mut self, children: &[&Column]) -> Result<()> {
        let elements = match self {
            Column::Tuple(elements) => elements,
            other => return Err(ChexError::type_mismatch("Tuple", other.column_type())),
        };
        if children.len() != elements.len() {
            return Err(ChexError::ArityMismatch {
                expected: elements.len(),
                actual: children.len(),
            });
        }
        if let Some(first) = children.first() {
            let expected = first.len();
            if let Some(other) = children.iter().find(|c| c.len() != expected) {
                return Err(ChexError::LengthMismatch {
                    what: "tuple element columns",
                    expected,
                    actual: other.len(),
                });
            }
        }
        for (element, child) in elements.iter().zip(children) {
            check_same_type(element, child)?;
        }
        for (element, child) in elements.iter_mut().zip(children) {
            Arc::make_mut(element).extend_from(child)?;
        }
        Ok(())
    }

    /// Append map rows from an `Array(Tuple(K, V))` column
    pub fn map_append_from_array(&mut self, array: &Column) -> Result<()> {
        let inner = match self {
            Column::Map(inner) => inner,
            other => return Err(ChexError::type_mismatch("Map", other.column_type())),
        };
        check_same_type(inner, array)?;
        Arc::make_mut(inner).extend_from(array)
    }

    /// Append rows from a plain or dictionary-encoded column, deduplicating
    /// into this column's dictionary
    pub fn low_cardinality_append_from_column(&mut self, source: &Column) -> Result<()> {
        match self {
            Column::LowCardinality { dictionary, keys, index } => {
                merge_into_dictionary(dictionary, index, keys, source)?;
                log::trace!("dictionary holds {} distinct values", dictionary.len());
                Ok(())
            }
            other => Err(ChexError::type_mismatch("LowCardinality", other.column_type())),
        }
    }

    /// Append rows of `nested` with per-row null flags
    pub fn nullable_append_from_column(&mut self, nested: &Column, nulls: &[bool]) -> Result<()> {
        let (own_nested, own_nulls) = match self {
            Column::Nullable { nested, nulls } => (nested, nulls),
            other => return Err(ChexError::type_mismatch("Nullable", other.column_type())),
        };
        if nested.len() != nulls.len() {
            return Err(ChexError::LengthMismatch {
                what: "nullable values and null flags",
                expected: nested.len(),
                actual: nulls.len(),
            });
        }
        check_same_type(own_nested, nested)?;
        Arc::make_mut(own_nested).extend_from(nested)?;
        own_nulls.extend(nulls.iter().map(|&n| n as u8));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::types::TypeRegistry;

    fn strings(values: &[&str]) -> Column {
        Column::String(values.iter().map(|s| s.to_string()).collect())
    }

    fn array_of_strings() -> Column {
        TypeRegistry::new().create("Array(String)").unwrap()
    }

    #[test]
    fn test_array_from_offsets() {
        let mut col = array_of_strings();
        col.array_append_from_column(&strings(&["a", "b", "c", "d", "e"]), &[2, 2, 5])
            .unwrap();
        assert_eq!(col.len(), 3);
        assert_eq!(col.at(0).unwrap(), Value::Array(vec!["a".into(), "b".into()]));
        assert_eq!(col.at(1).unwrap(), Value::Array(vec![]));
        assert_eq!(col.at(2).unwrap(), Value::Array(vec!["c".into(), "d".into(), "e".into()]));
    }

    #[test]
    fn test_array_rejects_decreasing_offsets() {
        let mut col = array_of_strings();
        let err = col
            .array_append_from_column(&strings(&["a", "b", "c"]), &[2, 1])
            .unwrap_err();
        assert!(matches!(err, ChexError::Monotonicity { index: 1, offset: 1, previous: 2 }));
        assert!(col.is_empty());
    }

    #[test]
    fn test_array_rejects_offset_past_nested() {
        let mut col = array_of_strings();
        let err = col
            .array_append_from_column(&strings(&["a"]), &[1, 3])
            .unwrap_err();
        assert!(matches!(err, ChexError::Range { end: 3, size: 1 }));
        assert!(col.is_empty());
    }

    #[test]
    fn test_array_appends_after_existing_rows() {
        let mut col = array_of_strings();
        let nested = strings(&["a", "b", "c"]);
        col.array_append_from_column(&nested, &[1]).unwrap();
        col.array_append_from_column(&nested, &[3]).unwrap();
        assert_eq!(col.at(1).unwrap(), Value::Array(vec!["a".into(), "b".into(), "c".into()]));
    }

    #[test]
    fn test_nested_arrays() {
        let registry = TypeRegistry::new();
        let mut inner = registry.create("Array(UInt8)").unwrap();
        inner.array_append_from_column(&Column::UInt8(vec![1, 2, 3]), &[1, 3]).unwrap();
        let mut outer = registry.create("Array(Array(UInt8))").unwrap();
        outer.array_append_from_column(&inner, &[2]).unwrap();
        assert_eq!(
            outer.at(0).unwrap(),
            Value::Array(vec![
                Value::Array(vec![Value::UInt64(1)]),
                Value::Array(vec![Value::UInt64(2), Value::UInt64(3)]),
            ])
        );
    }

    #[test]
    fn test_tuple_arity_and_lengths() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("Tuple(UInt8, String)").unwrap();
        let ids = Column::UInt8(vec![1, 2]);
        let names = strings(&["x", "y"]);
        let extra = strings(&["p", "q"]);

        let err = col.tuple_append_from_columns(&[&ids, &names, &extra]).unwrap_err();
        assert!(matches!(err, ChexError::ArityMismatch { expected: 2, actual: 3 }));

        let short = strings(&["x"]);
        let err = col.tuple_append_from_columns(&[&ids, &short]).unwrap_err();
        assert!(matches!(err, ChexError::LengthMismatch { expected: 2, actual: 1, .. }));

        let err = col.tuple_append_from_columns(&[&names, &ids]).unwrap_err();
        assert!(matches!(err, ChexError::TypeMismatch { .. }));
        assert!(col.is_empty());

        col.tuple_append_from_columns(&[&ids, &names]).unwrap();
        assert_eq!(col.at(1).unwrap(), Value::Tuple(vec![Value::UInt64(2), Value::from("y")]));
    }

    #[test]
    fn test_map_from_array() {
        let registry = TypeRegistry::new();
        let mut pairs = registry.create("Tuple(String, UInt64)").unwrap();
        pairs
            .tuple_append_from_columns(&[&strings(&["a", "b", "c"]), &Column::UInt64(vec![1, 2, 3])])
            .unwrap();
        let mut array = registry.create("Array(Tuple(String, UInt64))").unwrap();
        array.array_append_from_column(&pairs, &[2, 3]).unwrap();

        let mut map = registry.create("Map(String, UInt64)").unwrap();
        map.map_append_from_array(&array).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.at(0).unwrap(),
            Value::Map(vec![
                (Value::from("a"), Value::UInt64(1)),
                (Value::from("b"), Value::UInt64(2)),
            ])
        );

        let wrong = registry.create("Array(Tuple(String, String))").unwrap();
        assert!(matches!(map.map_append_from_array(&wrong), Err(ChexError::TypeMismatch { .. })));
    }

    #[test]
    fn test_low_cardinality_from_plain_and_encoded() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("LowCardinality(String)").unwrap();
        col.low_cardinality_append_from_column(&strings(&["x", "y", "x"])).unwrap();

        let mut other = registry.create("LowCardinality(String)").unwrap();
        other.low_cardinality_append_from_column(&strings(&["z", "y"])).unwrap();
        col.low_cardinality_append_from_column(&other).unwrap();

        match &col {
            Column::LowCardinality { dictionary, keys, .. } => {
                assert_eq!(dictionary.as_ref(), &strings(&["x", "y", "z"]));
                assert_eq!(keys, &vec![0, 1, 0, 2, 1]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            col.low_cardinality_append_from_column(&Column::UInt8(vec![1])),
            Err(ChexError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_nullable_from_column() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("Nullable(UInt64)").unwrap();
        col.nullable_append_from_column(&Column::UInt64(vec![10, 20, 30]), &[false, true, false])
            .unwrap();
        assert_eq!(col.at(1).unwrap(), Value::Null);
        assert!(matches!(
            col.nullable_append_from_column(&Column::UInt64(vec![1]), &[]),
            Err(ChexError::LengthMismatch { .. })
        ));
        assert_eq!(col.len(), 3);
    }
}
