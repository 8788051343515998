//! Flushes a memtable to a new segment file.

use anyhow::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use config::{FLAGS_TOMBSTONE, INDEX_ITEMS_OFFSET, RECORD_OVERHEAD};
use memtable::Memtable;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::format::{self, SegmentHeader};
use crate::index::SparseIndex;

/// Writes `mem` to a new segment file at `path`.
///
/// Single pass over the memtable in key order; every record is written,
/// tombstones included — a tombstone that fails to reach the segment would
/// let older segments resurrect the key. The sparse index is built first
/// (offsets relative to the record area), rebased once the header size is
/// known, and written between the header and the records.
///
/// The file is fsynced before the function returns, so callers may safely
/// record the path upstream and truncate the WAL afterwards.
///
/// # Errors
///
/// Returns an error if the memtable holds no entries at all (writing an
/// empty segment indicates a logic bug in the caller) or on I/O failure.
pub fn write_segment(path: &Path, mem: &Memtable) -> Result<()> {
    if mem.is_empty() {
        anyhow::bail!("refusing to write an empty segment (empty memtable)");
    }

    let mut index = SparseIndex::build(mem);
    let data_start = (INDEX_ITEMS_OFFSET + index.serialized_size()) as i64;
    index.rebase(data_start);

    let raw_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    let mut file = BufWriter::new(raw_file);

    format::write_header(
        &mut file,
        &SegmentHeader {
            num_records: mem.entry_count() as i64,
            data_start,
            index_len: index.len() as i32,
        },
    )?;
    index.write_to(&mut file)?;

    for (key, value) in mem.iter() {
        write_record(&mut file, key, value)?;
    }

    // Flush BufWriter, then sync the underlying file
    file.flush()?;
    file.into_inner()?.sync_all()?;

    Ok(())
}

/// Serializes one record: `total_size | key_size | key | flags | value`.
fn write_record<W: Write>(w: &mut W, key: &[u8], value: Option<&[u8]>) -> Result<()> {
    let value_bytes = value.unwrap_or(&[]);
    let total_size = RECORD_OVERHEAD + key.len() + value_bytes.len();
    w.write_i32::<LittleEndian>(total_size as i32)?;
    w.write_u8(key.len() as u8)?;
    w.write_all(key)?;
    w.write_u8(if value.is_none() { FLAGS_TOMBSTONE } else { 0 })?;
    w.write_all(value_bytes)?;
    Ok(())
}
