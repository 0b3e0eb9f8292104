//! Row projection: named columns to per-row records and back

use std::sync::Arc;

use ahash::AHashSet;

use super::decode_column;
use crate::block::Block;
use crate::column::Column;
use crate::data::{Row, Value};
use crate::types::ColumnType;
use crate::{ChexError, Result};

static NULL: Value = Value::Null;

/// Transpose named columns into rows.
///
/// All columns must have the same length and distinct names. Validation
/// happens before any row is produced, and each column is decoded once.
pub fn columns_to_rows(columns: &[(&str, &Column)]) -> Result<Vec<Row>> {
    let Some((_, first)) = columns.first() else {
        return Ok(Vec::new());
    };
    let row_count = first.len();

    let mut seen = AHashSet::with_capacity(columns.len());
    for (name, column) in columns {
        if !seen.insert(*name) {
            return Err(ChexError::DuplicateColumn(name.to_string()));
        }
        if column.len() != row_count {
            return Err(ChexError::LengthMismatch {
                what: "projected columns",
                expected: row_count,
                actual: column.len(),
            });
        }
    }
    if row_count == 0 {
        return Ok(Vec::new());
    }

    let names: Arc<[String]> = columns.iter().map(|(n, _)| n.to_string()).collect();
    let mut decoded: Vec<std::vec::IntoIter<Value>> = columns
        .iter()
        .map(|(_, c)| decode_column(c).into_iter())
        .collect();

    let rows = (0..row_count)
        .map(|_| {
            let values = decoded.iter_mut().filter_map(Iterator::next).collect();
            Row::new(Arc::clone(&names), values)
        })
        .collect();
    log::debug!("projected {} rows x {} columns", row_count, columns.len());
    Ok(rows)
}

/// Project every row of a block
pub fn block_to_rows(block: &Block) -> Result<Vec<Row>> {
    let columns: Vec<(&str, &Column)> = block.iter().map(|(n, c)| (n, c.as_ref())).collect();
    columns_to_rows(&columns)
}

fn accepts_null(ty: &ColumnType) -> bool {
    match ty {
        ColumnType::Nullable(_) => true,
        ColumnType::LowCardinality(inner) => accepts_null(inner),
        _ => false,
    }
}

/// Build a block from rows against an explicit schema.
///
/// A field missing from a row is NULL for nullable columns and an error
/// otherwise. Fields not named in the schema are ignored.
pub fn rows_to_block(rows: &[Row], schema: &[(&str, ColumnType)]) -> Result<Block> {
    let mut block = Block::new();
    for (name, ty) in schema {
        let nullable = accepts_null(ty);
        let values = rows
            .iter()
            .map(|row| match row.get(name) {
                Some(value) => Ok(value),
                None if nullable => Ok(&NULL),
                None => Err(ChexError::ColumnNotFound(name.to_string())),
            })
            .collect::<Result<Vec<&Value>>>()?;
        let mut column = ty.create_column();
        column.append_values(values)?;
        block.append_column(*name, column)?;
    }
    log::debug!("built block of {} rows from {} columns", rows.len(), schema.len());
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_from_columns() {
        let ids = Column::UInt64(vec![1, 2]);
        let names = Column::String(vec!["a".into(), "b".into()]);
        let rows = columns_to_rows(&[("id", &ids), ("name", &names)]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&Value::UInt64(1)));
        assert_eq!(rows[1].get("name"), Some(&Value::from("b")));
        assert!(Arc::ptr_eq(rows[0].shared_names(), rows[1].shared_names()));
    }

    #[test]
    fn test_rows_empty_inputs() {
        assert!(columns_to_rows(&[]).unwrap().is_empty());
        let empty = Column::Int8(Vec::new());
        assert!(columns_to_rows(&[("x", &empty)]).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let col = Column::UInt8(vec![1]);
        assert!(matches!(
            columns_to_rows(&[("x", &col), ("x", &col)]),
            Err(ChexError::DuplicateColumn(name)) if name == "x"
        ));
    }

    #[test]
    fn test_rows_to_block_missing_fields() {
        let rows = vec![
            Row::from_pairs([("id", Value::UInt64(1)), ("note", Value::from("hi"))]),
            Row::from_pairs([("id", Value::UInt64(2))]),
        ];
        let schema = [
            ("id", ColumnType::UInt32),
            ("note", ColumnType::Nullable(Box::new(ColumnType::String))),
        ];
        let block = rows_to_block(&rows, &schema).unwrap();
        assert_eq!(block.row_count(), 2);
        let back = block_to_rows(&block).unwrap();
        assert_eq!(back[1].get("note"), Some(&Value::Null));

        let strict = [("note", ColumnType::String)];
        assert!(matches!(
            rows_to_block(&rows, &strict),
            Err(ChexError::ColumnNotFound(name)) if name == "note"
        ));
    }
}
