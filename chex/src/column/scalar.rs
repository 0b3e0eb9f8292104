//! Bulk appends of host scalars
//!
//! Host values arrive at wide width (u64, i64, f64, strings). Each
//! [`HostScalar`] knows which leaf columns it can feed and narrows to the
//! column's native width with a plain `as` cast, so out-of-range values wrap
//! rather than fail.

use std::sync::Arc;

use super::{merge_into_dictionary, Column};
use crate::data::Uuid;
use crate::{ChexError, Result};

/// Host-side scalar that can be bulk-appended to a leaf column
pub trait HostScalar: Sized {
    /// Host kind, for error messages
    const KIND: &'static str;

    /// Append `values` to `column`.
    ///
    /// Fails with `TypeMismatch` before touching the column when the column
    /// cannot hold this host kind.
    fn extend_column(column: &mut Column, values: &[Self]) -> Result<()>;
}

fn mismatch<T: HostScalar>(column: &Column) -> ChexError {
    ChexError::type_mismatch(column.column_type(), T::KIND)
}

impl HostScalar for u64 {
    const KIND: &'static str = "u64";

    fn extend_column(column: &mut Column, values: &[u64]) -> Result<()> {
        match column {
            Column::UInt8(d) => d.extend(values.iter().map(|&v| v as u8)),
            Column::UInt16(d) => d.extend(values.iter().map(|&v| v as u16)),
            Column::UInt32(d) => d.extend(values.iter().map(|&v| v as u32)),
            Column::UInt64(d) => d.extend_from_slice(values),
            Column::Date(d) => d.extend(values.iter().map(|&v| v as u16)),
            Column::DateTime { data, .. } => data.extend(values.iter().map(|&v| v as u32)),
            Column::Bool(d) => d.extend(values.iter().map(|&v| v as u8 != 0)),
            other => return Err(mismatch::<Self>(other)),
        }
        Ok(())
    }
}

impl HostScalar for i64 {
    const KIND: &'static str = "i64";

    fn extend_column(column: &mut Column, values: &[i64]) -> Result<()> {
        match column {
            Column::Int8(d) => d.extend(values.iter().map(|&v| v as i8)),
            Column::Int16(d) => d.extend(values.iter().map(|&v| v as i16)),
            Column::Int32(d) => d.extend(values.iter().map(|&v| v as i32)),
            Column::Int64(d) => d.extend_from_slice(values),
            Column::DateTime64 { data, .. } => data.extend_from_slice(values),
            Column::Decimal { data, .. } => data.extend(values.iter().map(|&v| v as i128)),
            other => return Err(mismatch::<Self>(other)),
        }
        Ok(())
    }
}

impl HostScalar for f64 {
    const KIND: &'static str = "f64";

    fn extend_column(column: &mut Column, values: &[f64]) -> Result<()> {
        match column {
            Column::Float32(d) => d.extend(values.iter().map(|&v| v as f32)),
            Column::Float64(d) => d.extend_from_slice(values),
            other => return Err(mismatch::<Self>(other)),
        }
        Ok(())
    }
}

impl HostScalar for bool {
    const KIND: &'static str = "bool";

    fn extend_column(column: &mut Column, values: &[bool]) -> Result<()> {
        match column {
            Column::Bool(d) => d.extend_from_slice(values),
            Column::UInt8(d) => d.extend(values.iter().map(|&v| v as u8)),
            other => return Err(mismatch::<Self>(other)),
        }
        Ok(())
    }
}

impl HostScalar for String {
    const KIND: &'static str = "string";

    fn extend_column(column: &mut Column, values: &[String]) -> Result<()> {
        match column {
            Column::String(d) => d.extend_from_slice(values),
            other => return Err(mismatch::<Self>(other)),
        }
        Ok(())
    }
}

impl<'a> HostScalar for &'a str {
    const KIND: &'static str = "string";

    fn extend_column(column: &mut Column, values: &[&'a str]) -> Result<()> {
        match column {
            Column::String(d) => d.extend(values.iter().map(|s| s.to_string())),
            other => return Err(mismatch::<Self>(other)),
        }
        Ok(())
    }
}

/// Full-width decimal mantissas
impl HostScalar for i128 {
    const KIND: &'static str = "i128";

    fn extend_column(column: &mut Column, values: &[i128]) -> Result<()> {
        match column {
            Column::Decimal { data, .. } => data.extend_from_slice(values),
            other => return Err(mismatch::<Self>(other)),
        }
        Ok(())
    }
}

impl HostScalar for Uuid {
    const KIND: &'static str = "uuid";

    fn extend_column(column: &mut Column, values: &[Uuid]) -> Result<()> {
        match column {
            Column::Uuid(d) => d.extend_from_slice(values),
            other => return Err(mismatch::<Self>(other)),
        }
        Ok(())
    }
}

impl Column {
    /// Append a single host scalar; same result as a one-element [`append_bulk`](Self::append_bulk)
    pub fn append<T: HostScalar>(&mut self, value: T) -> Result<()> {
        self.append_bulk(std::slice::from_ref(&value))
    }

    /// Append host scalars to a leaf column, or to a LowCardinality column
    /// over a leaf type.
    pub fn append_bulk<T: HostScalar>(&mut self, values: &[T]) -> Result<()> {
        if let Column::LowCardinality { dictionary, keys, index } = self {
            let mut staged = dictionary.clone_empty();
            T::extend_column(&mut staged, values)?;
            return merge_into_dictionary(dictionary, index, keys, &staged);
        }
        T::extend_column(self, values)
    }

    /// Append to a Nullable column: `values[i]` goes to the nested column and
    /// `nulls[i]` marks whether row i is null.
    pub fn append_nullable_bulk<T: HostScalar>(&mut self, values: &[T], nulls: &[bool]) -> Result<()> {
        if values.len() != nulls.len() {
            return Err(ChexError::LengthMismatch {
                what: "nullable values and null flags",
                expected: values.len(),
                actual: nulls.len(),
            });
        }
        match self {
            Column::Nullable { nested, nulls: null_map } => {
                if !matches!(nested.as_ref(), Column::LowCardinality { .. }) {
                    // Reject before make_mut would clone a shared child
                    let mut scratch = nested.clone_empty();
                    T::extend_column(&mut scratch, &[])?;
                }
                Arc::make_mut(nested).append_bulk(values)?;
                null_map.extend(nulls.iter().map(|&n| n as u8));
                Ok(())
            }
            other => Err(ChexError::type_mismatch("Nullable", other.column_type())),
        }
    }

    /// Append UUIDs given as parallel high/low halves
    pub fn append_uuid_bulk(&mut self, highs: &[u64], lows: &[u64]) -> Result<()> {
        if highs.len() != lows.len() {
            return Err(ChexError::LengthMismatch {
                what: "UUID high and low halves",
                expected: highs.len(),
                actual: lows.len(),
            });
        }
        let uuids: Vec<Uuid> = highs
            .iter()
            .zip(lows)
            .map(|(&high, &low)| Uuid::new(high, low))
            .collect();
        self.append_bulk(&uuids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::types::TypeRegistry;

    #[test]
    fn test_narrowing_wraps() {
        let mut col = Column::UInt8(Vec::new());
        col.append_bulk(&[1u64, 255, 256, 300]).unwrap();
        assert_eq!(col, Column::UInt8(vec![1, 255, 0, 44]));

        let mut col = Column::Int8(Vec::new());
        col.append_bulk(&[127i64, 128, -129]).unwrap();
        assert_eq!(col, Column::Int8(vec![127, -128, 127]));
    }

    #[test]
    fn test_bulk_equals_single_appends() {
        let values = [3u64, 70_000, 5];
        let mut bulk = Column::UInt32(Vec::new());
        bulk.append_bulk(&values).unwrap();
        let mut single = Column::UInt32(Vec::new());
        for v in values {
            single.append(v).unwrap();
        }
        assert_eq!(bulk, single);
    }

    #[test]
    fn test_host_kind_mismatch_leaves_column_untouched() {
        let mut col = Column::String(vec!["a".into()]);
        let err = col.append_bulk(&[1.5f64]).unwrap_err();
        assert!(matches!(err, ChexError::TypeMismatch { .. }));
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn test_temporal_and_decimal_storage() {
        let registry = TypeRegistry::new();
        let mut date = registry.create("Date").unwrap();
        date.append_bulk(&[19_000u64]).unwrap();
        assert_eq!(date, Column::Date(vec![19_000]));

        let mut ts = registry.create("DateTime64(3, 'UTC')").unwrap();
        ts.append_bulk(&[-1i64, 1_700_000_000_123]).unwrap();
        assert_eq!(ts.at(1).unwrap(), Value::Int64(1_700_000_000_123));

        let mut dec = registry.create("Decimal(18, 2)").unwrap();
        dec.append_bulk(&[12345i64]).unwrap();
        dec.append(i128::from(i64::MAX) + 1).unwrap();
        match dec {
            Column::Decimal { data, .. } => assert_eq!(data, vec![12345, 1i128 << 63]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nullable_bulk() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("Nullable(UInt64)").unwrap();
        col.append_nullable_bulk(&[10u64, 20, 30], &[false, true, false]).unwrap();
        assert_eq!(col.at(0).unwrap(), Value::UInt64(10));
        assert_eq!(col.at(1).unwrap(), Value::Null);
        assert_eq!(col.at(2).unwrap(), Value::UInt64(30));

        let err = col.append_nullable_bulk(&[1u64, 2], &[false]).unwrap_err();
        assert!(matches!(err, ChexError::LengthMismatch { expected: 2, actual: 1, .. }));
        assert!(matches!(
            col.append_nullable_bulk(&["x"], &[false]),
            Err(ChexError::TypeMismatch { .. })
        ));
        assert_eq!(col.len(), 3);
    }

    #[test]
    fn test_uuid_bulk() {
        let mut col = Column::Uuid(Vec::new());
        col.append_uuid_bulk(&[0x0123456789abcdef], &[0xfedcba9876543210]).unwrap();
        assert_eq!(col.at(0).unwrap(), Value::from("01234567-89ab-cdef-fedc-ba9876543210"));
        assert!(matches!(
            col.append_uuid_bulk(&[1, 2], &[3]),
            Err(ChexError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_low_cardinality_bulk_deduplicates() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("LowCardinality(String)").unwrap();
        col.append_bulk(&["a", "b", "a", "a"]).unwrap();
        match &col {
            Column::LowCardinality { dictionary, keys, .. } => {
                assert_eq!(dictionary.len(), 2);
                assert_eq!(keys, &vec![0, 1, 0, 0]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(col.at(3).unwrap(), Value::from("a"));
    }
}
