//! Handle-based marshalling surface
//!
//! Hosts that cannot hold Rust values directly address columns and blocks
//! through opaque numeric handles. A [`Bridge`] owns one type registry and
//! the handle tables; it is an ordinary value created by the embedding
//! layer, not process-global state.
//!
//! Columns handed to a block are shared, and later appends through the
//! column handle copy before writing, so a block keeps the rows it saw when
//! the column was added.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::block::Block;
use crate::column::{Column, ColumnRef, HostScalar};
use crate::data::{Row, Value};
use crate::decode::{block_to_rows, decode_column};
use crate::types::{ColumnType, TypeRegistry};
use crate::{ChexError, Result};

/// Opaque reference to a column owned by a [`Bridge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnHandle(pub u64);

/// Opaque reference to a block owned by a [`Bridge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandle(pub u64);

/// Registry of live columns and blocks
#[derive(Debug)]
pub struct Bridge {
    types: TypeRegistry,
    columns: RwLock<AHashMap<u64, ColumnRef>>,
    blocks: RwLock<AHashMap<u64, Block>>,
    next_handle: AtomicU64,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge {
    pub fn new() -> Self {
        Self::with_registry(TypeRegistry::new())
    }

    pub fn with_registry(types: TypeRegistry) -> Self {
        Self {
            types,
            columns: RwLock::new(AHashMap::new()),
            blocks: RwLock::new(AHashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    fn allocate(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn missing_column(handle: ColumnHandle) -> ChexError {
        ChexError::NullPointer(format!("column handle {} is not live", handle.0))
    }

    fn missing_block(handle: BlockHandle) -> ChexError {
        ChexError::NullPointer(format!("block handle {} is not live", handle.0))
    }

    /// Create an empty column from a type descriptor
    pub fn column_create(&self, descriptor: &str) -> Result<ColumnHandle> {
        let column = self.types.create(descriptor)?;
        self.column_insert(column)
    }

    /// Take ownership of an already-built column after checking its structure
    pub fn column_insert(&self, column: Column) -> Result<ColumnHandle> {
        column.validate()?;
        let id = self.allocate();
        self.columns.write().insert(id, Arc::new(column));
        Ok(ColumnHandle(id))
    }

    /// Shared reference to a live column
    pub fn column(&self, handle: ColumnHandle) -> Result<ColumnRef> {
        self.columns
            .read()
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| Self::missing_column(handle))
    }

    pub fn column_size(&self, handle: ColumnHandle) -> Result<usize> {
        Ok(self.column(handle)?.len())
    }

    pub fn column_type(&self, handle: ColumnHandle) -> Result<ColumnType> {
        Ok(self.column(handle)?.column_type())
    }

    /// Run a mutation against a live column; blocks holding it are unaffected
    fn with_column_mut<T>(&self, handle: ColumnHandle, f: impl FnOnce(&mut Column) -> Result<T>) -> Result<T> {
        let mut columns = self.columns.write();
        let column = columns.get_mut(&handle.0).ok_or_else(|| Self::missing_column(handle))?;
        f(Arc::make_mut(column))
    }

    pub fn append_bulk<T: HostScalar>(&self, handle: ColumnHandle, values: &[T]) -> Result<()> {
        self.with_column_mut(handle, |c| c.append_bulk(values))
    }

    pub fn append_nullable_bulk<T: HostScalar>(&self, handle: ColumnHandle, values: &[T], nulls: &[bool]) -> Result<()> {
        self.with_column_mut(handle, |c| c.append_nullable_bulk(values, nulls))
    }

    pub fn append_uuid_bulk(&self, handle: ColumnHandle, highs: &[u64], lows: &[u64]) -> Result<()> {
        self.with_column_mut(handle, |c| c.append_uuid_bulk(highs, lows))
    }

    pub fn append_values(&self, handle: ColumnHandle, values: &[Value]) -> Result<()> {
        self.with_column_mut(handle, |c| c.append_values(values))
    }

    pub fn array_append_from_column(&self, array: ColumnHandle, nested: ColumnHandle, offsets: &[u64]) -> Result<()> {
        let nested = self.column(nested)?;
        self.with_column_mut(array, |c| c.array_append_from_column(&nested, offsets))
    }

    pub fn tuple_append_from_columns(&self, tuple: ColumnHandle, children: &[ColumnHandle]) -> Result<()> {
        let children = children
            .iter()
            .map(|&h| self.column(h))
            .collect::<Result<Vec<ColumnRef>>>()?;
        let refs: Vec<&Column> = children.iter().map(|c| c.as_ref()).collect();
        self.with_column_mut(tuple, |c| c.tuple_append_from_columns(&refs))
    }

    pub fn map_append_from_array(&self, map: ColumnHandle, array: ColumnHandle) -> Result<()> {
        let array = self.column(array)?;
        self.with_column_mut(map, |c| c.map_append_from_array(&array))
    }

    pub fn low_cardinality_append_from_column(&self, target: ColumnHandle, source: ColumnHandle) -> Result<()> {
        let source = self.column(source)?;
        self.with_column_mut(target, |c| c.low_cardinality_append_from_column(&source))
    }

    pub fn nullable_append_from_column(&self, target: ColumnHandle, nested: ColumnHandle, nulls: &[bool]) -> Result<()> {
        let nested = self.column(nested)?;
        self.with_column_mut(target, |c| c.nullable_append_from_column(&nested, nulls))
    }

    /// Decode every row of a column
    pub fn column_values(&self, handle: ColumnHandle) -> Result<Vec<Value>> {
        Ok(decode_column(self.column(handle)?.as_ref()))
    }

    /// Drop the bridge's reference; blocks holding the column keep their copy
    pub fn release_column(&self, handle: ColumnHandle) -> Result<()> {
        self.columns
            .write()
            .remove(&handle.0)
            .ok_or_else(|| Self::missing_column(handle))?;
        log::debug!("released column handle {}", handle.0);
        Ok(())
    }

    pub fn block_create(&self) -> BlockHandle {
        let id = self.allocate();
        self.blocks.write().insert(id, Block::new());
        BlockHandle(id)
    }

    /// Add a live column to a block under `name`
    pub fn block_append_column(&self, block: BlockHandle, name: &str, column: ColumnHandle) -> Result<()> {
        let column = self.column(column)?;
        let mut blocks = self.blocks.write();
        let target = blocks.get_mut(&block.0).ok_or_else(|| Self::missing_block(block))?;
        target.append_column(name, column)?;
        log::trace!("block {} now has {} columns", block.0, target.column_count());
        Ok(())
    }

    /// Run `f` against a live block
    pub fn with_block<T>(&self, handle: BlockHandle, f: impl FnOnce(&Block) -> T) -> Result<T> {
        let blocks = self.blocks.read();
        let block = blocks.get(&handle.0).ok_or_else(|| Self::missing_block(handle))?;
        Ok(f(block))
    }

    pub fn block_row_count(&self, handle: BlockHandle) -> Result<usize> {
        self.with_block(handle, Block::row_count)
    }

    pub fn block_column_count(&self, handle: BlockHandle) -> Result<usize> {
        self.with_block(handle, Block::column_count)
    }

    pub fn block_to_rows(&self, handle: BlockHandle) -> Result<Vec<Row>> {
        self.with_block(handle, block_to_rows)?
    }

    /// Remove a block from the registry and return it
    pub fn take_block(&self, handle: BlockHandle) -> Result<Block> {
        self.blocks
            .write()
            .remove(&handle.0)
            .ok_or_else(|| Self::missing_block(handle))
    }

    pub fn release_block(&self, handle: BlockHandle) -> Result<()> {
        self.take_block(handle)?;
        log::debug!("released block handle {}", handle.0);
        Ok(())
    }
}
