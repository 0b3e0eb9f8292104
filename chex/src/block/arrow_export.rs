//! Arrow export for blocks
//!
//! Each column maps onto the closest Arrow type; composite columns map onto
//! List, Struct, Map and Dictionary arrays without going through host values.

use std::sync::Arc;

use arrow::array::{
    make_array, Array, ArrayRef, BooleanArray, Date32Array, Decimal128Array, DictionaryArray,
    FixedSizeBinaryArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    Int8Array, ListArray, MapArray, StringArray, StructArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray, UInt16Array,
    UInt32Array, UInt64Array, UInt8Array,
};
use arrow::buffer::{Buffer, NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{DataType, Field, Fields, Schema, UInt32Type};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use super::Block;
use crate::column::Column;
use crate::{ChexError, Result};

impl Block {
    /// Convert the block into an Arrow record batch
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.column_count());
        let mut arrays = Vec::with_capacity(self.column_count());
        for (name, column) in self.iter() {
            let array = column_to_arrow(column)?;
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }
        let options = RecordBatchOptions::new().with_row_count(Some(self.row_count()));
        let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
        Ok(batch)
    }
}

fn offsets_to_arrow(offsets: &[u64]) -> Result<OffsetBuffer<i32>> {
    let mut converted = Vec::with_capacity(offsets.len() + 1);
    converted.push(0i32);
    for &offset in offsets {
        let offset = i32::try_from(offset).map_err(|_| ChexError::Range {
            end: offset,
            size: i32::MAX as usize,
        })?;
        converted.push(offset);
    }
    Ok(OffsetBuffer::new(ScalarBuffer::from(converted)))
}

/// Convert one column into an Arrow array
pub(crate) fn column_to_arrow(column: &Column) -> Result<ArrayRef> {
    let array: ArrayRef = match column {
        Column::UInt8(d) => Arc::new(UInt8Array::from(d.clone())),
        Column::UInt16(d) => Arc::new(UInt16Array::from(d.clone())),
        Column::UInt32(d) => Arc::new(UInt32Array::from(d.clone())),
        Column::UInt64(d) => Arc::new(UInt64Array::from(d.clone())),
        Column::Int8(d) => Arc::new(Int8Array::from(d.clone())),
        Column::Int16(d) => Arc::new(Int16Array::from(d.clone())),
        Column::Int32(d) => Arc::new(Int32Array::from(d.clone())),
        Column::Int64(d) => Arc::new(Int64Array::from(d.clone())),
        Column::Float32(d) => Arc::new(Float32Array::from(d.clone())),
        Column::Float64(d) => Arc::new(Float64Array::from(d.clone())),
        Column::String(d) => Arc::new(StringArray::from_iter_values(d.iter())),
        Column::Bool(d) => Arc::new(BooleanArray::from(d.clone())),
        Column::Date(d) => Arc::new(Date32Array::from(d.iter().map(|&v| v as i32).collect::<Vec<_>>())),
        Column::DateTime { timezone, data } => {
            let values: Vec<i64> = data.iter().map(|&v| v as i64).collect();
            Arc::new(TimestampSecondArray::from(values).with_timezone_opt(timezone.clone()))
        }
        Column::DateTime64 { precision, timezone, data } => {
            let tz = timezone.clone();
            match precision {
                0 => Arc::new(TimestampSecondArray::from(data.clone()).with_timezone_opt(tz)),
                3 => Arc::new(TimestampMillisecondArray::from(data.clone()).with_timezone_opt(tz)),
                6 => Arc::new(TimestampMicrosecondArray::from(data.clone()).with_timezone_opt(tz)),
                9 => Arc::new(TimestampNanosecondArray::from(data.clone()).with_timezone_opt(tz)),
                // No Arrow unit for this precision, export raw ticks
                _ => Arc::new(Int64Array::from(data.clone())),
            }
        }
        Column::Decimal { precision, scale, data } => {
            let array = Decimal128Array::from(data.clone()).with_precision_and_scale(*precision, *scale as i8)?;
            // Mantissas are stored unchecked; Arrow requires them to fit the precision
            array.validate_decimal_precision(*precision)?;
            Arc::new(array)
        }
        Column::Uuid(d) => {
            let mut bytes = Vec::with_capacity(d.len() * 16);
            for uuid in d {
                bytes.extend_from_slice(&uuid.high.to_be_bytes());
                bytes.extend_from_slice(&uuid.low.to_be_bytes());
            }
            Arc::new(FixedSizeBinaryArray::try_new(16, Buffer::from_vec(bytes), None)?)
        }
        Column::Nullable { nested, nulls } => {
            let inner = column_to_arrow(nested)?;
            let validity = NullBuffer::from(nulls.iter().map(|&n| n == 0).collect::<Vec<bool>>());
            let data = inner.to_data().into_builder().nulls(Some(validity)).build()?;
            make_array(data)
        }
        Column::Array { offsets, nested } => {
            let values = column_to_arrow(nested)?;
            let field = Arc::new(Field::new("item", values.data_type().clone(), true));
            Arc::new(ListArray::try_new(field, offsets_to_arrow(offsets)?, values, None)?)
        }
        Column::Tuple(elements) => {
            let arrays = elements
                .iter()
                .map(|e| column_to_arrow(e))
                .collect::<Result<Vec<ArrayRef>>>()?;
            let fields: Fields = arrays
                .iter()
                .enumerate()
                .map(|(i, a)| Field::new((i + 1).to_string(), a.data_type().clone(), true))
                .collect();
            Arc::new(StructArray::try_new(fields, arrays, None)?)
        }
        Column::Map(inner) => map_to_arrow(inner)?,
        Column::LowCardinality { dictionary, keys, .. } => {
            let values = column_to_arrow(dictionary)?;
            let keys = UInt32Array::from(keys.clone());
            Arc::new(DictionaryArray::<UInt32Type>::try_new(keys, values)?)
        }
    };
    Ok(array)
}

fn map_to_arrow(inner: &Column) -> Result<ArrayRef> {
    let (offsets, entries) = match inner {
        Column::Array { offsets, nested } => match nested.as_ref() {
            Column::Tuple(kv) if kv.len() == 2 => (offsets, kv),
            other => return Err(ChexError::type_mismatch("Tuple(K, V)", other.column_type())),
        },
        other => return Err(ChexError::type_mismatch("Array(Tuple(K, V))", other.column_type())),
    };
    let keys = column_to_arrow(&entries[0])?;
    let values = column_to_arrow(&entries[1])?;
    let fields = Fields::from(vec![
        Field::new("keys", keys.data_type().clone(), false),
        Field::new("values", values.data_type().clone(), true),
    ]);
    let struct_type = DataType::Struct(fields.clone());
    let entries = StructArray::try_new(fields, vec![keys, values], None)?;
    let field = Arc::new(Field::new("entries", struct_type, false));
    Ok(Arc::new(MapArray::try_new(field, offsets_to_arrow(offsets)?, entries, None, false)?))
}
