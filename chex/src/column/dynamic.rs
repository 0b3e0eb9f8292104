//! Appends of dynamically-typed host values
//!
//! Values are staged into a scratch column of the target type and merged in
//! one step, so a failing value leaves the target column unchanged.

use std::sync::Arc;

use super::{merge_into_dictionary, Column};
use crate::data::{Uuid, Value};
use crate::{ChexError, Result};

fn unsigned(value: &Value, expected: &'static str) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| ChexError::type_mismatch(expected, value.kind_name()))
}

fn signed(value: &Value, expected: &'static str) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| ChexError::type_mismatch(expected, value.kind_name()))
}

fn float(value: &Value, expected: &'static str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| ChexError::type_mismatch(expected, value.kind_name()))
}

impl Column {
    /// Append one host value
    pub fn append_value(&mut self, value: &Value) -> Result<()> {
        self.append_values(std::iter::once(value))
    }

    /// Append host values, all or nothing
    pub fn append_values<'a, I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut staged = match &*self {
            Column::LowCardinality { dictionary, .. } => dictionary.clone_empty(),
            other => other.clone_empty(),
        };
        for value in values {
            staged.push_value(value)?;
        }
        match self {
            Column::LowCardinality { dictionary, keys, index } => {
                merge_into_dictionary(dictionary, index, keys, &staged)
            }
            other => other.extend_from(&staged),
        }
    }

    fn push_value(&mut self, value: &Value) -> Result<()> {
        match (self, value) {
            (Column::Nullable { nested, nulls }, Value::Null) => {
                Arc::make_mut(nested).push_default()?;
                nulls.push(1);
            }
            (Column::Nullable { nested, nulls }, v) => {
                Arc::make_mut(nested).push_value(v)?;
                nulls.push(0);
            }
            (Column::UInt8(d), v) => d.push(unsigned(v, "UInt8")? as u8),
            (Column::UInt16(d), v) => d.push(unsigned(v, "UInt16")? as u16),
            (Column::UInt32(d), v) => d.push(unsigned(v, "UInt32")? as u32),
            (Column::UInt64(d), v) => d.push(unsigned(v, "UInt64")?),
            (Column::Int8(d), v) => d.push(signed(v, "Int8")? as i8),
            (Column::Int16(d), v) => d.push(signed(v, "Int16")? as i16),
            (Column::Int32(d), v) => d.push(signed(v, "Int32")? as i32),
            (Column::Int64(d), v) => d.push(signed(v, "Int64")?),
            (Column::Float32(d), v) => d.push(float(v, "Float32")? as f32),
            (Column::Float64(d), v) => d.push(float(v, "Float64")?),
            (Column::String(d), Value::String(s)) => d.push(s.clone()),
            (Column::Bool(d), Value::Bool(b)) => d.push(*b),
            (Column::Bool(d), v) => d.push(unsigned(v, "Bool")? as u8 != 0),
            (Column::Date(d), v) => d.push(unsigned(v, "Date")? as u16),
            (Column::DateTime { data, .. }, v) => data.push(unsigned(v, "DateTime")? as u32),
            (Column::DateTime64 { data, .. }, v) => data.push(signed(v, "DateTime64")?),
            (Column::Decimal { data, .. }, v) => data.push(signed(v, "Decimal")? as i128),
            (Column::Uuid(d), Value::String(s)) => d.push(s.parse::<Uuid>()?),
            (Column::Array { offsets, nested }, Value::Array(items)) => {
                let target = Arc::make_mut(nested);
                for item in items {
                    target.push_value(item)?;
                }
                offsets.push(target.len() as u64);
            }
            (Column::Tuple(elements), Value::Tuple(items)) => {
                if elements.len() != items.len() {
                    return Err(ChexError::ArityMismatch {
                        expected: elements.len(),
                        actual: items.len(),
                    });
                }
                for (element, item) in elements.iter_mut().zip(items) {
                    Arc::make_mut(element).push_value(item)?;
                }
            }
            (Column::Map(inner), Value::Map(pairs)) => {
                let entries = pairs
                    .iter()
                    .map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()]))
                    .collect();
                Arc::make_mut(inner).push_value(&Value::Array(entries))?;
            }
            // Nested dictionaries only ever live in a scratch column, whose
            // index keeps each merge proportional to the one staged row
            (Column::LowCardinality { dictionary, keys, index }, v) => {
                let mut staged = dictionary.clone_empty();
                staged.push_value(v)?;
                merge_into_dictionary(dictionary, index, keys, &staged)?;
            }
            (column, v) => {
                return Err(ChexError::type_mismatch(column.column_type(), v.kind_name()))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn test_append_nested_values() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("Array(Nullable(String))").unwrap();
        let row = Value::Array(vec![Value::from("a"), Value::Null]);
        col.append_value(&row).unwrap();
        col.append_value(&Value::Array(vec![])).unwrap();
        assert_eq!(col.len(), 2);
        assert_eq!(col.at(0).unwrap(), row);
        assert_eq!(col.at(1).unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn test_append_values_is_atomic() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("Tuple(UInt8, String)").unwrap();
        let good = Value::Tuple(vec![Value::UInt64(1), Value::from("x")]);
        let short = Value::Tuple(vec![Value::UInt64(2)]);
        let err = col.append_values([&good, &short]).unwrap_err();
        assert!(matches!(err, ChexError::ArityMismatch { expected: 2, actual: 1 }));
        assert!(col.is_empty());

        col.append_values([&good]).unwrap();
        assert_eq!(col.at(0).unwrap(), good);
    }

    #[test]
    fn test_append_map_and_uuid() {
        let registry = TypeRegistry::new();
        let mut map = registry.create("Map(String, Int64)").unwrap();
        let value = Value::Map(vec![(Value::from("k"), Value::Int64(-3))]);
        map.append_value(&value).unwrap();
        assert_eq!(map.at(0).unwrap(), value);

        let mut uuid = registry.create("UUID").unwrap();
        let text = "01234567-89ab-cdef-fedc-ba9876543210";
        uuid.append_value(&Value::from(text)).unwrap();
        assert_eq!(uuid.at(0).unwrap(), Value::from(text));
        assert!(uuid.append_value(&Value::from("nope")).is_err());
        assert_eq!(uuid.len(), 1);
    }

    #[test]
    fn test_null_into_non_nullable_rejected() {
        let mut col = Column::Int64(Vec::new());
        assert!(matches!(
            col.append_value(&Value::Null),
            Err(ChexError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_integer_into_bool_truncates_like_bulk() {
        let values = [0u64, 1, 2, 255, 256, 512, 257];
        let mut bulk = Column::Bool(Vec::new());
        bulk.append_bulk(&values).unwrap();
        let mut dynamic = Column::Bool(Vec::new());
        for &v in &values {
            dynamic.append_value(&Value::UInt64(v)).unwrap();
        }
        assert_eq!(dynamic, bulk);
        assert_eq!(dynamic, Column::Bool(vec![false, true, true, true, false, false, true]));
    }

    #[test]
    fn test_array_of_low_cardinality_values() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("Array(LowCardinality(String))").unwrap();
        let rows: Vec<Value> = (0..200)
            .map(|i| Value::Array(vec![Value::from(format!("t{}", i % 3)), Value::from("t0")]))
            .collect();
        col.append_values(&rows).unwrap();
        col.append_values(&rows[..1]).unwrap();
        match &col {
            Column::Array { nested, .. } => match nested.as_ref() {
                Column::LowCardinality { dictionary, keys, .. } => {
                    assert_eq!(dictionary.len(), 3);
                    assert_eq!(keys.len(), 402);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(col.at(200).unwrap(), rows[0]);
    }

    #[test]
    fn test_low_cardinality_values() {
        let registry = TypeRegistry::new();
        let mut col = registry.create("LowCardinality(Nullable(String))").unwrap();
        col.append_values([&Value::from("a"), &Value::Null, &Value::from("a"), &Value::Null])
            .unwrap();
        match &col {
            Column::LowCardinality { dictionary, keys, .. } => {
                assert_eq!(dictionary.len(), 2);
                assert_eq!(keys, &vec![0, 1, 0, 1]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(col.at(1).unwrap(), Value::Null);
    }
}
