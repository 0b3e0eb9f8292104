//! Column to host value decoding
//!
//! Every column variant decodes, including every nesting the type grammar
//! admits. Integers widen to 64 bits, floats to f64, Date/DateTime to their
//! unsigned epoch counts, DateTime64 to signed ticks, UUIDs to their
//! canonical string, and Decimal mantissas narrow to i64 with wraparound.

mod rows;

pub use rows::{block_to_rows, columns_to_rows, rows_to_block};

use crate::column::Column;
use crate::data::Value;

/// Decode every row of a column.
///
/// The column must satisfy [`Column::validate`]. Blocks and bridge handles
/// check this on entry; hand-assembled columns should be validated first.
pub fn decode_column(column: &Column) -> Vec<Value> {
    match column {
        Column::UInt8(d) => d.iter().map(|&v| Value::UInt64(v as u64)).collect(),
        Column::UInt16(d) => d.iter().map(|&v| Value::UInt64(v as u64)).collect(),
        Column::UInt32(d) => d.iter().map(|&v| Value::UInt64(v as u64)).collect(),
        Column::UInt64(d) => d.iter().map(|&v| Value::UInt64(v)).collect(),
        Column::Int8(d) => d.iter().map(|&v| Value::Int64(v as i64)).collect(),
        Column::Int16(d) => d.iter().map(|&v| Value::Int64(v as i64)).collect(),
        Column::Int32(d) => d.iter().map(|&v| Value::Int64(v as i64)).collect(),
        Column::Int64(d) => d.iter().map(|&v| Value::Int64(v)).collect(),
        Column::Float32(d) => d.iter().map(|&v| Value::Float64(v as f64)).collect(),
        Column::Float64(d) => d.iter().map(|&v| Value::Float64(v)).collect(),
        Column::String(d) => d.iter().cloned().map(Value::String).collect(),
        Column::Bool(d) => d.iter().map(|&v| Value::Bool(v)).collect(),
        Column::Date(d) => d.iter().map(|&v| Value::UInt64(v as u64)).collect(),
        Column::DateTime { data, .. } => data.iter().map(|&v| Value::UInt64(v as u64)).collect(),
        Column::DateTime64 { data, .. } => data.iter().map(|&v| Value::Int64(v)).collect(),
        Column::Decimal { data, .. } => data.iter().map(|&v| Value::Int64(v as i64)).collect(),
        Column::Uuid(d) => d.iter().map(|u| Value::String(u.to_string())).collect(),
        Column::Nullable { nested, nulls } => decode_column(nested)
            .into_iter()
            .zip(nulls)
            .map(|(v, &null)| if null != 0 { Value::Null } else { v })
            .collect(),
        Column::Array { offsets, nested } => {
            let mut items = decode_column(nested).into_iter();
            let mut previous = 0u64;
            offsets
                .iter()
                .map(|&offset| {
                    let row = items.by_ref().take((offset - previous) as usize).collect();
                    previous = offset;
                    Value::Array(row)
                })
                .collect()
        }
        Column::Tuple(elements) => {
            let mut decoded: Vec<std::vec::IntoIter<Value>> =
                elements.iter().map(|e| decode_column(e).into_iter()).collect();
            (0..column.len())
                .map(|_| Value::Tuple(decoded.iter_mut().filter_map(Iterator::next).collect()))
                .collect()
        }
        Column::Map(inner) => decode_column(inner).into_iter().map(entries_to_map).collect(),
        Column::LowCardinality { dictionary, keys, .. } => {
            let values = decode_column(dictionary);
            keys.iter().map(|&k| values[k as usize].clone()).collect()
        }
    }
}

/// Decode a single row; `row` must be in bounds
pub(crate) fn decode_cell(column: &Column, row: usize) -> Value {
    match column {
        Column::UInt8(d) => Value::UInt64(d[row] as u64),
        Column::UInt16(d) => Value::UInt64(d[row] as u64),
        Column::UInt32(d) => Value::UInt64(d[row] as u64),
        Column::UInt64(d) => Value::UInt64(d[row]),
        Column::Int8(d) => Value::Int64(d[row] as i64),
        Column::Int16(d) => Value::Int64(d[row] as i64),
        Column::Int32(d) => Value::Int64(d[row] as i64),
        Column::Int64(d) => Value::Int64(d[row]),
        Column::Float32(d) => Value::Float64(d[row] as f64),
        Column::Float64(d) => Value::Float64(d[row]),
        Column::String(d) => Value::String(d[row].clone()),
        Column::Bool(d) => Value::Bool(d[row]),
        Column::Date(d) => Value::UInt64(d[row] as u64),
        Column::DateTime { data, .. } => Value::UInt64(data[row] as u64),
        Column::DateTime64 { data, .. } => Value::Int64(data[row]),
        Column::Decimal { data, .. } => Value::Int64(data[row] as i64),
        Column::Uuid(d) => Value::String(d[row].to_string()),
        Column::Nullable { nested, nulls } => {
            if nulls[row] != 0 {
                Value::Null
            } else {
                decode_cell(nested, row)
            }
        }
        Column::Array { offsets, nested } => {
            let (start, end) = Column::array_bounds(offsets, row);
            Value::Array((start..end).map(|i| decode_cell(nested, i)).collect())
        }
        Column::Tuple(elements) => {
            Value::Tuple(elements.iter().map(|e| decode_cell(e, row)).collect())
        }
        Column::Map(inner) => entries_to_map(decode_cell(inner, row)),
        Column::LowCardinality { dictionary, keys, .. } => decode_cell(dictionary, keys[row] as usize),
    }
}

/// Turn a decoded `Array(Tuple(K, V))` row into map pairs
fn entries_to_map(entries: Value) -> Value {
    match entries {
        Value::Array(items) => Value::Map(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Tuple(mut kv) if kv.len() == 2 => {
                        let value = kv.pop()?;
                        let key = kv.pop()?;
                        Some((key, value))
                    }
                    _ => None,
                })
                .collect(),
        ),
        other => other,
    }
}
