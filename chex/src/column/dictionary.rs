//! LowCardinality dictionary maintenance
//!
//! A dictionary-encoded column carries a [`DictionaryIndex`] next to its
//! dictionary. The index maps the byte key of each dictionary row to its
//! position and is extended as entries are added, so merging `n` rows costs
//! O(n) regardless of how large the dictionary already is.

use std::sync::Arc;

use ahash::AHashMap;

use super::{Column, ColumnRef};
use crate::{ChexError, Result};

/// Byte-key lookup over the first `indexed` rows of a dictionary.
///
/// The index is a cache: an empty index is always valid and catches up with
/// the dictionary on the next merge. Equality ignores it.
#[derive(Debug, Clone, Default)]
pub struct DictionaryIndex {
    slots: AHashMap<Vec<u8>, u32>,
    indexed: usize,
}

impl PartialEq for DictionaryIndex {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl DictionaryIndex {
    /// Hash dictionary rows added since the last merge
    fn catch_up(&mut self, dictionary: &Column) {
        if self.indexed > dictionary.len() {
            *self = Self::default();
        }
        if self.indexed == dictionary.len() {
            return;
        }
        self.slots.reserve(dictionary.len() - self.indexed);
        let mut key = Vec::new();
        for row in self.indexed..dictionary.len() {
            key.clear();
            dictionary.row_key(row, &mut key);
            self.slots.entry(key.clone()).or_insert(row as u32);
        }
        self.indexed = dictionary.len();
    }

    pub fn len(&self) -> usize {
        self.indexed
    }

    pub fn is_empty(&self) -> bool {
        self.indexed == 0
    }
}

/// Append the rows of `source` to a dictionary-encoded column.
///
/// `source` is either a plain column of the dictionary's type or another
/// LowCardinality column over it. Values already present in the dictionary
/// reuse their key; new values are added once. On error neither the
/// dictionary, the index nor the keys change.
pub(crate) fn merge_into_dictionary(
    dictionary: &mut ColumnRef,
    index: &mut DictionaryIndex,
    keys: &mut Vec<u32>,
    source: &Column,
) -> Result<()> {
    let (values, source_keys) = match source {
        Column::LowCardinality { dictionary: d, keys: k, .. } => (d.as_ref(), Some(k.as_slice())),
        other => (other, None),
    };
    let (expected, actual) = (dictionary.column_type(), values.column_type());
    if expected != actual {
        return Err(ChexError::type_mismatch(expected, actual));
    }
    index.catch_up(dictionary);

    let rows = source_keys.map_or(values.len(), <[u32]>::len);
    let mut new_keys = Vec::with_capacity(rows);
    let mut pending: AHashMap<Vec<u8>, u32> = AHashMap::new();
    let mut additions = Vec::new();
    let mut next = dictionary.len();
    let mut key = Vec::new();
    for i in 0..rows {
        let row = source_keys.map_or(i, |k| k[i] as usize);
        key.clear();
        values.row_key(row, &mut key);
        let known = index.slots.get(&key).or_else(|| pending.get(&key)).copied();
        let slot = match known {
            Some(slot) => slot,
            None => {
                let slot = u32::try_from(next).map_err(|_| ChexError::Range {
                    end: next as u64,
                    size: u32::MAX as usize,
                })?;
                pending.insert(key.clone(), slot);
                additions.push(row);
                next += 1;
                slot
            }
        };
        new_keys.push(slot);
    }

    if !additions.is_empty() {
        let target = Arc::make_mut(dictionary);
        if source_keys.is_none() && additions.len() == values.len() {
            target.extend_from(values)?;
        } else {
            for &row in &additions {
                target.extend_from(&values.slice_range(row, row + 1))?;
            }
        }
        index.slots.extend(pending);
        index.indexed = target.len();
    }
    keys.extend(new_keys);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn keys_of(column: &Column) -> Vec<u32> {
        match column {
            Column::LowCardinality { keys, .. } => keys.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_index_tracks_single_appends() {
        let mut col = TypeRegistry::new().create("LowCardinality(String)").unwrap();
        for i in 0..1_000 {
            col.append(format!("v{}", i % 10)).unwrap();
        }
        match &col {
            Column::LowCardinality { dictionary, keys, index } => {
                assert_eq!(dictionary.len(), 10);
                assert_eq!(index.len(), 10);
                assert_eq!(keys[..12], [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 1]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_index_rebuilt_for_external_dictionary() {
        // Dictionary and keys received as-is, with an empty index
        let mut col = Column::LowCardinality {
            dictionary: Arc::new(Column::String(vec!["x".into(), "y".into()])),
            keys: vec![1, 0],
            index: DictionaryIndex::default(),
        };
        col.append_bulk(&["y", "z", "x"]).unwrap();
        assert_eq!(keys_of(&col), vec![1, 0, 1, 2, 0]);
    }

    #[test]
    fn test_slice_then_append_reuses_shared_entries() {
        let mut col = TypeRegistry::new().create("LowCardinality(UInt64)").unwrap();
        col.append_bulk(&[5u64, 6, 7]).unwrap();
        let mut tail = col.slice(1, 2).unwrap();
        tail.append_bulk(&[5u64, 8]).unwrap();
        assert_eq!(keys_of(&tail), vec![1, 2, 0, 3]);
        // The original dictionary is untouched
        assert_eq!(keys_of(&col), vec![0, 1, 2]);
        match &col {
            Column::LowCardinality { dictionary, .. } => assert_eq!(dictionary.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failed_merge_leaves_index_consistent() {
        let mut col = TypeRegistry::new().create("LowCardinality(String)").unwrap();
        col.append("a").unwrap();
        assert!(col.low_cardinality_append_from_column(&Column::UInt8(vec![1])).is_err());
        col.append_bulk(&["b", "a"]).unwrap();
        assert_eq!(keys_of(&col), vec![0, 1, 0]);
    }
}
