//! Logical column types
//!
//! `ColumnType` is the closed set of logical types a column can carry.
//! Descriptors are parsed by [`TypeParser`] and resolved through an explicit
//! [`TypeRegistry`] owned by the caller.

mod parser;
mod registry;

pub use parser::TypeParser;
pub use registry::TypeRegistry;

use std::fmt;
use std::sync::Arc;

use crate::column::{Column, DictionaryIndex};

/// Largest precision accepted by `Decimal(P, S)`
pub const MAX_DECIMAL_PRECISION: u8 = 38;
/// Largest sub-second precision accepted by `DateTime64(N)`
pub const MAX_DATETIME64_PRECISION: u8 = 9;

/// Logical column type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bool,
    /// Days since Unix epoch, stored as u16
    Date,
    /// Seconds since Unix epoch, stored as u32
    DateTime { timezone: Option<String> },
    /// Ticks at 10^-precision seconds, stored as i64
    DateTime64 { precision: u8, timezone: Option<String> },
    /// Scaled mantissa, stored as i128
    Decimal { precision: u8, scale: u8 },
    Uuid,
    Nullable(Box<ColumnType>),
    Array(Box<ColumnType>),
    Tuple(Vec<ColumnType>),
    Map(Box<ColumnType>, Box<ColumnType>),
    LowCardinality(Box<ColumnType>),
}

impl ColumnType {
    /// Create an empty column of this type
    pub fn create_column(&self) -> Column {
        match self {
            ColumnType::UInt8 => Column::UInt8(Vec::new()),
            ColumnType::UInt16 => Column::UInt16(Vec::new()),
            ColumnType::UInt32 => Column::UInt32(Vec::new()),
            ColumnType::UInt64 => Column::UInt64(Vec::new()),
            ColumnType::Int8 => Column::Int8(Vec::new()),
            ColumnType::Int16 => Column::Int16(Vec::new()),
            ColumnType::Int32 => Column::Int32(Vec::new()),
            ColumnType::Int64 => Column::Int64(Vec::new()),
            ColumnType::Float32 => Column::Float32(Vec::new()),
            ColumnType::Float64 => Column::Float64(Vec::new()),
            ColumnType::String => Column::String(Vec::new()),
            ColumnType::Bool => Column::Bool(Vec::new()),
            ColumnType::Date => Column::Date(Vec::new()),
            ColumnType::DateTime { timezone } => Column::DateTime {
                timezone: timezone.clone(),
                data: Vec::new(),
            },
            ColumnType::DateTime64 { precision, timezone } => Column::DateTime64 {
                precision: *precision,
                timezone: timezone.clone(),
                data: Vec::new(),
            },
            ColumnType::Decimal { precision, scale } => Column::Decimal {
                precision: *precision,
                scale: *scale,
                data: Vec::new(),
            },
            ColumnType::Uuid => Column::Uuid(Vec::new()),
            ColumnType::Nullable(nested) => Column::Nullable {
                nested: Arc::new(nested.create_column()),
                nulls: Vec::new(),
            },
            ColumnType::Array(item) => Column::Array {
                offsets: Vec::new(),
                nested: Arc::new(item.create_column()),
            },
            ColumnType::Tuple(elements) => Column::Tuple(
                elements.iter().map(|t| Arc::new(t.create_column())).collect(),
            ),
            ColumnType::Map(key, value) => Column::Map(Arc::new(
                ColumnType::map_storage(key, value).create_column(),
            )),
            ColumnType::LowCardinality(inner) => Column::LowCardinality {
                dictionary: Arc::new(inner.create_column()),
                keys: Vec::new(),
                index: DictionaryIndex::default(),
            },
        }
    }

    /// Physical layout of `Map(K, V)`: `Array(Tuple(K, V))`
    pub fn map_storage(key: &ColumnType, value: &ColumnType) -> ColumnType {
        ColumnType::Array(Box::new(ColumnType::Tuple(vec![key.clone(), value.clone()])))
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            ColumnType::Nullable(_)
                | ColumnType::Array(_)
                | ColumnType::Tuple(_)
                | ColumnType::Map(_, _)
                | ColumnType::LowCardinality(_)
        )
    }

    /// Short kind name without parameters, e.g. `Array` for `Array(UInt8)`
    pub fn kind_name(&self) -> &'static str {
        match self {
            ColumnType::UInt8 => "UInt8",
            ColumnType::UInt16 => "UInt16",
            ColumnType::UInt32 => "UInt32",
            ColumnType::UInt64 => "UInt64",
            ColumnType::Int8 => "Int8",
            ColumnType::Int16 => "Int16",
            ColumnType::Int32 => "Int32",
            ColumnType::Int64 => "Int64",
            ColumnType::Float32 => "Float32",
            ColumnType::Float64 => "Float64",
            ColumnType::String => "String",
            ColumnType::Bool => "Bool",
            ColumnType::Date => "Date",
            ColumnType::DateTime { .. } => "DateTime",
            ColumnType::DateTime64 { .. } => "DateTime64",
            ColumnType::Decimal { .. } => "Decimal",
            ColumnType::Uuid => "UUID",
            ColumnType::Nullable(_) => "Nullable",
            ColumnType::Array(_) => "Array",
            ColumnType::Tuple(_) => "Tuple",
            ColumnType::Map(_, _) => "Map",
            ColumnType::LowCardinality(_) => "LowCardinality",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::DateTime { timezone: Some(tz) } => write!(f, "DateTime('{}')", tz),
            ColumnType::DateTime64 { precision, timezone } => match timezone {
                Some(tz) => write!(f, "DateTime64({}, '{}')", precision, tz),
                None => write!(f, "DateTime64({})", precision),
            },
            ColumnType::Decimal { precision, scale } => write!(f, "Decimal({}, {})", precision, scale),
            ColumnType::Nullable(nested) => write!(f, "Nullable({})", nested),
            ColumnType::Array(item) => write!(f, "Array({})", item),
            ColumnType::Tuple(elements) => {
                write!(f, "Tuple(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
            ColumnType::Map(key, value) => write!(f, "Map({}, {})", key, value),
            ColumnType::LowCardinality(inner) => write!(f, "LowCardinality({})", inner),
            other => f.write_str(other.kind_name()),
        }
    }
}
