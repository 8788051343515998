//! The sparse block index.
//!
//! Instead of one index entry per key, a segment carries one item per block
//! of [`config::INDEX_INTERVAL`] live records. Each item records the first
//! and last key of its block and the block's byte range, so a point lookup
//! costs one block read regardless of segment size.
//!
//! Blocks are *sized* by live-record count but *cover* every record:
//! a tombstone extends the current block's `end_key` and `end_offset`, so
//! index search finds tombstone keys and deletion shadowing works across
//! segments.

use anyhow::{bail, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use config::{INDEX_INTERVAL, KEY_LEN_SZ, RECORD_OVERHEAD};
use memtable::Memtable;
use std::io::{Read, Write};

/// One sparse-index item: a contiguous block of records whose keys lie in
/// `[start_key, end_key]` (inclusive both ends) and whose bytes occupy
/// `[start_offset, end_offset)` (exclusive end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexItem {
    pub start_key: Vec<u8>,
    pub end_key: Vec<u8>,
    pub start_offset: i64,
    pub end_offset: i64,
}

impl IndexItem {
    /// Serialized size: two length-prefixed keys plus two i64 offsets.
    fn serialized_size(&self) -> usize {
        2 * KEY_LEN_SZ + self.start_key.len() + self.end_key.len() + 16
    }
}

/// The in-memory sparse index of one segment, ordered by key range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseIndex {
    items: Vec<IndexItem>,
}

impl SparseIndex {
    /// Builds the index for a memtable about to be flushed.
    ///
    /// Offsets are relative to the start of the record area; the writer
    /// rebases them once the final header size is known.
    pub fn build(mem: &Memtable) -> Self {
        let mut items = Vec::new();
        let mut current: Option<IndexItem> = None;
        let mut live_in_block = 0usize;
        let mut offset = 0i64;

        for (key, value) in mem.iter() {
            let record_len = (RECORD_OVERHEAD + key.len() + value.map_or(0, <[u8]>::len)) as i64;

            match current.as_mut() {
                Some(item) => {
                    item.end_key = key.to_vec();
                    item.end_offset += record_len;
                }
                None => {
                    current = Some(IndexItem {
                        start_key: key.to_vec(),
                        end_key: key.to_vec(),
                        start_offset: offset,
                        end_offset: offset + record_len,
                    });
                }
            }

            if value.is_some() {
                live_in_block += 1;
                if live_in_block == INDEX_INTERVAL {
                    items.push(current.take().expect("open block"));
                    live_in_block = 0;
                }
            }

            offset += record_len;
        }

        if let Some(item) = current {
            items.push(item);
        }

        Self { items }
    }

    /// Finds the block that may contain `key`.
    ///
    /// Walks items in order; the first item whose `end_key >= key` decides:
    /// a hit iff its `start_key <= key`, otherwise the key falls in a gap
    /// between blocks and is absent from the segment.
    pub fn search(&self, key: &[u8]) -> Option<(i64, i64)> {
        for item in &self.items {
            if item.end_key.as_slice() >= key {
                if item.start_key.as_slice() <= key {
                    return Some((item.start_offset, item.end_offset));
                }
                return None;
            }
        }
        None
    }

    /// Shifts every offset by `delta` (the final record-area start).
    pub fn rebase(&mut self, delta: i64) {
        for item in &mut self.items {
            item.start_offset += delta;
            item.end_offset += delta;
        }
    }

    /// Total byte size of the serialized index items.
    pub fn serialized_size(&self) -> usize {
        self.items.iter().map(IndexItem::serialized_size).sum()
    }

    /// Writes all items in order.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        for item in &self.items {
            w.write_u8(item.start_key.len() as u8)?;
            w.write_all(&item.start_key)?;
            w.write_u8(item.end_key.len() as u8)?;
            w.write_all(&item.end_key)?;
            w.write_i64::<LittleEndian>(item.start_offset)?;
            w.write_i64::<LittleEndian>(item.end_offset)?;
        }
        Ok(())
    }

    /// Reads `index_len` items from `r`.
    pub fn read_from<R: Read>(r: &mut R, index_len: i32) -> Result<Self> {
        let mut items = Vec::with_capacity(index_len as usize);
        for _ in 0..index_len {
            let start_key_size = r.read_u8()? as usize;
            let mut start_key = vec![0u8; start_key_size];
            r.read_exact(&mut start_key)?;
            let end_key_size = r.read_u8()? as usize;
            let mut end_key = vec![0u8; end_key_size];
            r.read_exact(&mut end_key)?;
            let start_offset = r.read_i64::<LittleEndian>()?;
            let end_offset = r.read_i64::<LittleEndian>()?;
            if start_offset >= end_offset {
                bail!(
                    "corrupt index item: offsets [{}, {}) are empty or inverted",
                    start_offset,
                    end_offset
                );
            }
            items.push(IndexItem {
                start_key,
                end_key,
                start_offset,
                end_offset,
            });
        }
        Ok(Self { items })
    }

    /// The items, in key order.
    pub fn items(&self) -> &[IndexItem] {
        &self.items
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if the index has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
