//! PyO3 bindings for the handle-based bridge
//!
//! Columns and blocks live in the Rust-side [`Bridge`]; Python holds plain
//! integer handles. Failures surface as `ValueError` carrying the JSON
//! error payload as the message.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyTuple};

use crate::bridge::{BlockHandle, Bridge, ColumnHandle};
use crate::client::ErrorPayload;
use crate::data::{Row, Uuid, Value};
use crate::ChexError;

fn to_py_err(err: ChexError) -> PyErr {
    PyValueError::new_err(ErrorPayload::from(&err).to_json())
}

/// Convert a Python object to a host value
fn py_to_value(obj: &Bound<'_, PyAny>) -> PyResult<Value> {
    if obj.is_none() {
        return Ok(Value::Null);
    }

    if let Ok(b) = obj.extract::<bool>() {
        return Ok(Value::Bool(b));
    }

    if let Ok(i) = obj.extract::<i64>() {
        return Ok(Value::Int64(i));
    }

    // Integers above i64::MAX
    if let Ok(u) = obj.extract::<u64>() {
        return Ok(Value::UInt64(u));
    }

    if let Ok(f) = obj.extract::<f64>() {
        return Ok(Value::Float64(f));
    }

    if let Ok(s) = obj.extract::<String>() {
        return Ok(Value::String(s));
    }

    if let Ok(list) = obj.downcast::<PyList>() {
        let items = list.iter().map(|item| py_to_value(&item)).collect::<PyResult<Vec<_>>>()?;
        return Ok(Value::Array(items));
    }

    if let Ok(tuple) = obj.downcast::<PyTuple>() {
        let items = tuple.iter().map(|item| py_to_value(&item)).collect::<PyResult<Vec<_>>>()?;
        return Ok(Value::Tuple(items));
    }

    if let Ok(dict) = obj.downcast::<PyDict>() {
        let mut pairs = Vec::with_capacity(dict.len());
        for (k, v) in dict.iter() {
            pairs.push((py_to_value(&k)?, py_to_value(&v)?));
        }
        return Ok(Value::Map(pairs));
    }

    Err(PyValueError::new_err(format!(
        "Unsupported value type: {}",
        obj.get_type().name()?
    )))
}

/// Convert a host value to a Python object
fn value_to_py(py: Python<'_>, val: &Value) -> PyResult<PyObject> {
    match val {
        Value::Null => Ok(py.None()),
        Value::Bool(b) => Ok(b.into_py(py)),
        Value::UInt64(u) => Ok(u.into_py(py)),
        Value::Int64(i) => Ok(i.into_py(py)),
        Value::Float64(f) => Ok(f.into_py(py)),
        Value::String(s) => Ok(s.into_py(py)),
        Value::Array(items) => {
            let list = PyList::empty_bound(py);
            for v in items {
                list.append(value_to_py(py, v)?)?;
            }
            Ok(list.into())
        }
        Value::Tuple(items) => {
            let elements = items
                .iter()
                .map(|v| value_to_py(py, v))
                .collect::<PyResult<Vec<_>>>()?;
            Ok(PyTuple::new_bound(py, elements).into())
        }
        Value::Map(pairs) => {
            let dict = PyDict::new_bound(py);
            for (k, v) in pairs {
                dict.set_item(value_to_py(py, k)?, value_to_py(py, v)?)?;
            }
            Ok(dict.into())
        }
    }
}

fn row_to_py(py: Python<'_>, row: &Row) -> PyResult<PyObject> {
    let dict = PyDict::new_bound(py);
    for (name, value) in row.iter() {
        dict.set_item(name, value_to_py(py, value)?)?;
    }
    Ok(dict.into())
}

/// Bridge - columnar marshalling for ClickHouse blocks
///
/// Build typed columns from Python lists, assemble them into blocks and
/// project blocks back into lists of dicts.
#[pyclass(name = "Bridge")]
pub struct PyBridge {
    inner: Bridge,
}

#[pymethods]
impl PyBridge {
    #[new]
    fn new() -> Self {
        Self { inner: Bridge::new() }
    }

    /// Create an empty column from a type descriptor such as "Array(Nullable(String))"
    fn column_create(&self, type_name: &str) -> PyResult<u64> {
        self.inner.column_create(type_name).map(|h| h.0).map_err(to_py_err)
    }

    fn column_size(&self, column: u64) -> PyResult<usize> {
        self.inner.column_size(ColumnHandle(column)).map_err(to_py_err)
    }

    fn column_type(&self, column: u64) -> PyResult<String> {
        self.inner
            .column_type(ColumnHandle(column))
            .map(|t| t.to_string())
            .map_err(to_py_err)
    }

    fn append_uint64(&self, py: Python<'_>, column: u64, values: Vec<u64>) -> PyResult<()> {
        py.allow_threads(|| self.inner.append_bulk(ColumnHandle(column), &values))
            .map_err(to_py_err)
    }

    fn append_int64(&self, py: Python<'_>, column: u64, values: Vec<i64>) -> PyResult<()> {
        py.allow_threads(|| self.inner.append_bulk(ColumnHandle(column), &values))
            .map_err(to_py_err)
    }

    fn append_float64(&self, py: Python<'_>, column: u64, values: Vec<f64>) -> PyResult<()> {
        py.allow_threads(|| self.inner.append_bulk(ColumnHandle(column), &values))
            .map_err(to_py_err)
    }

    fn append_string(&self, py: Python<'_>, column: u64, values: Vec<String>) -> PyResult<()> {
        py.allow_threads(|| self.inner.append_bulk(ColumnHandle(column), &values))
            .map_err(to_py_err)
    }

    fn append_bool(&self, py: Python<'_>, column: u64, values: Vec<bool>) -> PyResult<()> {
        py.allow_threads(|| self.inner.append_bulk(ColumnHandle(column), &values))
            .map_err(to_py_err)
    }

    /// Append UUIDs from parallel lists of high and low 64-bit halves
    fn append_uuid(&self, column: u64, highs: Vec<u64>, lows: Vec<u64>) -> PyResult<()> {
        self.inner
            .append_uuid_bulk(ColumnHandle(column), &highs, &lows)
            .map_err(to_py_err)
    }

    /// Append UUIDs given in canonical string form
    fn append_uuid_strings(&self, column: u64, values: Vec<String>) -> PyResult<()> {
        let uuids = values
            .iter()
            .map(|s| s.parse::<Uuid>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(to_py_err)?;
        self.inner.append_bulk(ColumnHandle(column), &uuids).map_err(to_py_err)
    }

    fn append_nullable_uint64(&self, column: u64, values: Vec<u64>, nulls: Vec<bool>) -> PyResult<()> {
        self.inner
            .append_nullable_bulk(ColumnHandle(column), &values, &nulls)
            .map_err(to_py_err)
    }

    fn append_nullable_int64(&self, column: u64, values: Vec<i64>, nulls: Vec<bool>) -> PyResult<()> {
        self.inner
            .append_nullable_bulk(ColumnHandle(column), &values, &nulls)
            .map_err(to_py_err)
    }

    fn append_nullable_float64(&self, column: u64, values: Vec<f64>, nulls: Vec<bool>) -> PyResult<()> {
        self.inner
            .append_nullable_bulk(ColumnHandle(column), &values, &nulls)
            .map_err(to_py_err)
    }

    fn append_nullable_string(&self, column: u64, values: Vec<String>, nulls: Vec<bool>) -> PyResult<()> {
        self.inner
            .append_nullable_bulk(ColumnHandle(column), &values, &nulls)
            .map_err(to_py_err)
    }

    /// Append arbitrary Python values; None becomes NULL, lists arrays, tuples tuples, dicts maps
    fn append_values(&self, column: u64, values: &Bound<'_, PyList>) -> PyResult<()> {
        let values = values.iter().map(|v| py_to_value(&v)).collect::<PyResult<Vec<_>>>()?;
        self.inner.append_values(ColumnHandle(column), &values).map_err(to_py_err)
    }

    fn array_append_from_column(&self, array: u64, nested: u64, offsets: Vec<u64>) -> PyResult<()> {
        self.inner
            .array_append_from_column(ColumnHandle(array), ColumnHandle(nested), &offsets)
            .map_err(to_py_err)
    }

    fn tuple_append_from_columns(&self, tuple: u64, children: Vec<u64>) -> PyResult<()> {
        let children: Vec<ColumnHandle> = children.into_iter().map(ColumnHandle).collect();
        self.inner
            .tuple_append_from_columns(ColumnHandle(tuple), &children)
            .map_err(to_py_err)
    }

    fn map_append_from_array(&self, map: u64, array: u64) -> PyResult<()> {
        self.inner
            .map_append_from_array(ColumnHandle(map), ColumnHandle(array))
            .map_err(to_py_err)
    }

    fn low_cardinality_append_from_column(&self, target: u64, source: u64) -> PyResult<()> {
        self.inner
            .low_cardinality_append_from_column(ColumnHandle(target), ColumnHandle(source))
            .map_err(to_py_err)
    }

    fn nullable_append_from_column(&self, target: u64, nested: u64, nulls: Vec<bool>) -> PyResult<()> {
        self.inner
            .nullable_append_from_column(ColumnHandle(target), ColumnHandle(nested), &nulls)
            .map_err(to_py_err)
    }

    /// Decode a column into a Python list
    fn column_values(&self, py: Python<'_>, column: u64) -> PyResult<PyObject> {
        let values = py
            .allow_threads(|| self.inner.column_values(ColumnHandle(column)))
            .map_err(to_py_err)?;
        let list = PyList::empty_bound(py);
        for v in &values {
            list.append(value_to_py(py, v)?)?;
        }
        Ok(list.into())
    }

    fn release_column(&self, column: u64) -> PyResult<()> {
        self.inner.release_column(ColumnHandle(column)).map_err(to_py_err)
    }

    fn block_create(&self) -> u64 {
        self.inner.block_create().0
    }

    fn block_append_column(&self, block: u64, name: &str, column: u64) -> PyResult<()> {
        self.inner
            .block_append_column(BlockHandle(block), name, ColumnHandle(column))
            .map_err(to_py_err)
    }

    fn block_row_count(&self, block: u64) -> PyResult<usize> {
        self.inner.block_row_count(BlockHandle(block)).map_err(to_py_err)
    }

    fn block_column_count(&self, block: u64) -> PyResult<usize> {
        self.inner.block_column_count(BlockHandle(block)).map_err(to_py_err)
    }

    /// Project a block into a list of dicts keyed by column name
    fn block_to_rows(&self, py: Python<'_>, block: u64) -> PyResult<PyObject> {
        let rows = py
            .allow_threads(|| self.inner.block_to_rows(BlockHandle(block)))
            .map_err(to_py_err)?;
        let list = PyList::empty_bound(py);
        for row in &rows {
            list.append(row_to_py(py, row)?)?;
        }
        Ok(list.into())
    }

    fn release_block(&self, block: u64) -> PyResult<()> {
        self.inner.release_block(BlockHandle(block)).map_err(to_py_err)
    }
}
