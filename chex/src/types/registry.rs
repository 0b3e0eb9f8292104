//! Descriptor-driven column construction

use ahash::AHashMap;

use super::{ColumnType, TypeParser};
use crate::column::Column;
use crate::Result;

/// SQL-compatibility aliases registered by [`TypeRegistry::new`]
fn sql_aliases() -> [(&'static str, ColumnType); 11] {
    [
        ("TINYINT", ColumnType::Int8),
        ("SMALLINT", ColumnType::Int16),
        ("INT", ColumnType::Int32),
        ("INTEGER", ColumnType::Int32),
        ("BIGINT", ColumnType::Int64),
        ("FLOAT", ColumnType::Float32),
        ("REAL", ColumnType::Float32),
        ("DOUBLE", ColumnType::Float64),
        ("TEXT", ColumnType::String),
        ("VARCHAR", ColumnType::String),
        ("BOOLEAN", ColumnType::Bool),
    ]
}

/// Maps type descriptors to empty typed columns.
///
/// The registry is an ordinary value owned by whoever drives marshalling;
/// there is no process-wide instance.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    aliases: AHashMap<String, ColumnType>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry with the SQL-compatibility aliases installed
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (name, ty) in sql_aliases() {
            registry.aliases.insert(name.to_string(), ty);
        }
        registry
    }

    /// Registry that only understands canonical type names
    pub fn empty() -> Self {
        Self { aliases: AHashMap::new() }
    }

    /// Register a case-insensitive alias for a descriptor
    pub fn register_alias(&mut self, alias: &str, descriptor: &str) -> Result<()> {
        let ty = self.parse(descriptor)?;
        self.aliases.insert(alias.to_ascii_uppercase(), ty);
        Ok(())
    }

    /// Parse a descriptor into a logical type
    pub fn parse(&self, descriptor: &str) -> Result<ColumnType> {
        TypeParser::parse_with_aliases(descriptor, Some(&self.aliases))
    }

    /// Create a zero-row column for a descriptor
    pub fn create(&self, descriptor: &str) -> Result<Column> {
        let ty = self.parse(descriptor)?;
        log::debug!("created column of type {}", ty);
        Ok(ty.create_column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChexError;

    #[test]
    fn test_every_primitive_creates_empty_column() {
        let registry = TypeRegistry::new();
        let descriptors = [
            "UInt8", "UInt16", "UInt32", "UInt64", "Int8", "Int16", "Int32", "Int64",
            "Float32", "Float64", "String", "Bool", "Date", "DateTime", "DateTime64(3)",
            "Decimal(18, 2)", "UUID",
        ];
        for descriptor in descriptors {
            let col = registry.create(descriptor).unwrap();
            assert_eq!(col.len(), 0, "{}", descriptor);
        }
    }

    #[test]
    fn test_composites_create_empty_column() {
        let registry = TypeRegistry::new();
        for descriptor in ["Nullable(UInt64)", "Array(Array(Array(String)))", "Tuple(UInt8, String)", "Map(String, Int64)", "LowCardinality(String)"] {
            let col = registry.create(descriptor).unwrap();
            assert_eq!(col.len(), 0);
            assert_eq!(col.column_type().to_string(), descriptor);
        }
    }

    #[test]
    fn test_unknown_type() {
        let registry = TypeRegistry::new();
        assert!(matches!(registry.create("Int256"), Err(ChexError::UnknownType { .. })));
    }

    #[test]
    fn test_aliases() {
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.parse("bigint").unwrap(), ColumnType::Int64);
        assert_eq!(registry.parse("Array(TEXT)").unwrap(), ColumnType::Array(Box::new(ColumnType::String)));

        registry.register_alias("money", "Decimal(18, 4)").unwrap();
        assert_eq!(registry.parse("Nullable(Money)").unwrap().to_string(), "Nullable(Decimal(18, 4))");

        let empty = TypeRegistry::empty();
        assert!(empty.parse("BIGINT").is_err());
    }
}
