//! Chex Columnar Marshalling Core
//!
//! Converts between dynamically-typed host values and strongly-typed,
//! column-oriented blocks for the ClickHouse native protocol.
//! Provides Python bindings via PyO3 behind the `python` feature.

pub mod types;
pub mod data;
pub mod column;
pub mod block;
pub mod decode;
pub mod client;
pub mod bridge;
#[cfg(feature = "python")]
pub mod python;

// Re-export main types
pub use types::{ColumnType, TypeRegistry};
pub use data::{Row, Uuid, Value};
pub use column::{Column, ColumnRef, DictionaryIndex, HostScalar};
pub use block::Block;
pub use decode::{block_to_rows, columns_to_rows, decode_column, rows_to_block};
pub use client::{Client, ClientError, ClientOptions, Compression, ErrorKind, ErrorPayload, MemoryTransport, Transport};
pub use bridge::{BlockHandle, Bridge, ColumnHandle};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module entry point
#[cfg(feature = "python")]
#[pymodule]
fn _native(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyBridge>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

/// Marshalling error type
#[derive(Debug, thiserror::Error)]
pub enum ChexError {
    #[error("Unknown column type `{descriptor}`: {reason}")]
    UnknownType { descriptor: String, reason: String },

    #[error("Length mismatch in {what}: expected {expected}, got {actual}")]
    LengthMismatch { what: &'static str, expected: usize, actual: usize },

    #[error("Arity mismatch: expected {expected} columns, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Offsets must be monotonically increasing: offsets[{index}] = {offset} < {previous}")]
    Monotonicity { index: usize, offset: u64, previous: u64 },

    #[error("Range {end} exceeds column size {size}")]
    Range { end: u64, size: usize },

    #[error("Invalid handle: {0}")]
    NullPointer(String),

    #[error("Index {index} out of bounds for column of size {size}")]
    Index { index: usize, size: usize },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChexError {
    pub(crate) fn type_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        ChexError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Variant name, used as the `name` field of an outward error payload
    pub fn variant_name(&self) -> &'static str {
        match self {
            ChexError::UnknownType { .. } => "UnknownTypeError",
            ChexError::LengthMismatch { .. } => "LengthMismatchError",
            ChexError::ArityMismatch { .. } => "ArityMismatchError",
            ChexError::Monotonicity { .. } => "MonotonicityError",
            ChexError::Range { .. } => "RangeError",
            ChexError::NullPointer(_) => "NullPointerError",
            ChexError::Index { .. } => "IndexError",
            ChexError::TypeMismatch { .. } => "TypeMismatchError",
            ChexError::DuplicateColumn(_) => "DuplicateColumnError",
            ChexError::ColumnNotFound(_) => "ColumnNotFoundError",
            ChexError::Client(_) => "ClientError",
            ChexError::Arrow(_) => "ArrowError",
            ChexError::Json(_) => "JsonError",
        }
    }
}

pub type Result<T> = std::result::Result<T, ChexError>;
