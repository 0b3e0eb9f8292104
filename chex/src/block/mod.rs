//! Named, equal-length sets of columns
//!
//! A block is one row batch on the wire. Columns are held by shared
//! reference, so handing a column to a block freezes the block's view of it:
//! later appends through another holder copy before writing.

mod arrow_export;

use crate::column::{Column, ColumnRef};
use crate::data::Row;
use crate::{ChexError, Result};

/// Ordered collection of named columns of equal length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    columns: Vec<(String, ColumnRef)>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named column; its length must match the columns already present
    /// and it must pass [`Column::validate`]
    pub fn append_column(&mut self, name: impl Into<String>, column: impl Into<ColumnRef>) -> Result<()> {
        let name = name.into();
        let column = column.into();
        if self.columns.iter().any(|(n, _)| *n == name) {
            return Err(ChexError::DuplicateColumn(name));
        }
        column.validate()?;
        if let Some((_, first)) = self.columns.first() {
            if first.len() != column.len() {
                return Err(ChexError::LengthMismatch {
                    what: "block columns",
                    expected: first.len(),
                    actual: column.len(),
                });
            }
        }
        self.columns.push((name, column));
        Ok(())
    }

    /// Rows in the block; zero for a block without columns
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&ColumnRef> {
        self.columns.get(index).map(|(_, c)| c)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnRef> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate `(name, column)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnRef)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Project the block into rows
    pub fn to_rows(&self) -> Result<Vec<Row>> {
        crate::decode::block_to_rows(self)
    }

    /// Borrow the column `name` as a concrete column
    pub fn get(&self, name: &str) -> Result<&Column> {
        self.column_by_name(name)
            .map(|c| c.as_ref())
            .ok_or_else(|| ChexError::ColumnNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_block_counts() {
        let mut block = Block::new();
        assert_eq!(block.row_count(), 0);
        block.append_column("id", Column::UInt64(vec![1, 2, 3])).unwrap();
        block.append_column("flag", Column::Bool(vec![true, false, true])).unwrap();
        assert_eq!(block.row_count(), 3);
        assert_eq!(block.column_count(), 2);
        assert_eq!(block.names().collect::<Vec<_>>(), vec!["id", "flag"]);
        assert!(block.get("flag").is_ok());
        assert!(matches!(block.get("nope"), Err(ChexError::ColumnNotFound(_))));
    }

    #[test]
    fn test_block_rejects_bad_columns() {
        let mut block = Block::new();
        block.append_column("id", Column::UInt64(vec![1, 2])).unwrap();
        assert!(matches!(
            block.append_column("id", Column::UInt64(vec![3, 4])),
            Err(ChexError::DuplicateColumn(_))
        ));
        assert!(matches!(
            block.append_column("name", Column::String(vec!["x".into()])),
            Err(ChexError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
        assert_eq!(block.column_count(), 1);
    }

    #[test]
    fn test_block_rejects_malformed_received_columns() {
        let mut block = Block::new();
        let offsets_past_nested = Column::Array { offsets: vec![1, 5], nested: Arc::new(Column::UInt8(vec![1, 2])) };
        assert!(matches!(
            block.append_column("a", offsets_past_nested),
            Err(ChexError::Range { end: 5, size: 2 })
        ));
        let stray_key = Column::LowCardinality {
            dictionary: Arc::new(Column::String(vec!["x".into()])),
            keys: vec![0, 1],
            index: Default::default(),
        };
        assert!(matches!(block.append_column("k", stray_key), Err(ChexError::Range { end: 1, size: 1 })));
        assert_eq!(block.column_count(), 0);
    }

    #[test]
    fn test_block_view_frozen_at_hand_off() {
        let mut column: ColumnRef = Arc::new(Column::UInt8(vec![1]));
        let mut block = Block::new();
        block.append_column("x", Arc::clone(&column)).unwrap();
        Arc::make_mut(&mut column).append(2u64).unwrap();
        assert_eq!(column.len(), 2);
        assert_eq!(block.row_count(), 1);
    }
}
