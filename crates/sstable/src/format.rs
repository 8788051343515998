//! Segment header read/write helpers.
//!
//! ## Header (28 bytes)
//!
//! ```text
//! [version tag: 8][num_records: i64 LE][data_start: i64 LE][index_len: i32 LE]
//! ```
//!
//! `num_records` counts every record in the record area, tombstones
//! included. `data_start` is the absolute byte offset of the record area:
//! header size plus the serialized sparse index.

use anyhow::{bail, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use config::{FORMAT_VERSION, INDEX_ITEMS_OFFSET};
use std::io::{Read, Write};

/// Parsed segment header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Number of records in the record area, tombstones included.
    pub num_records: i64,
    /// Absolute byte offset of the first record.
    pub data_start: i64,
    /// Number of sparse-index items following the header.
    pub index_len: i32,
}

/// Writes the 28-byte segment header.
pub fn write_header<W: Write>(w: &mut W, header: &SegmentHeader) -> Result<()> {
    w.write_all(&FORMAT_VERSION)?;
    w.write_i64::<LittleEndian>(header.num_records)?;
    w.write_i64::<LittleEndian>(header.data_start)?;
    w.write_i32::<LittleEndian>(header.index_len)?;
    Ok(())
}

/// Reads and validates the segment header.
///
/// # Errors
///
/// Fails on a wrong version tag or on field values no valid writer could
/// have produced (negative counts, a data_start inside the header).
pub fn read_header<R: Read>(r: &mut R) -> Result<SegmentHeader> {
    let mut tag = [0u8; config::VER_SZ];
    r.read_exact(&mut tag)?;
    if tag != FORMAT_VERSION {
        bail!("bad segment version tag: {:?}", tag);
    }

    let num_records = r.read_i64::<LittleEndian>()?;
    let data_start = r.read_i64::<LittleEndian>()?;
    let index_len = r.read_i32::<LittleEndian>()?;

    if num_records < 0 || index_len < 0 {
        bail!(
            "corrupt segment header: num_records {} / index_len {}",
            num_records,
            index_len
        );
    }
    if data_start < INDEX_ITEMS_OFFSET as i64 {
        bail!(
            "corrupt segment header: data_start {} inside the header area",
            data_start
        );
    }

    Ok(SegmentHeader {
        num_records,
        data_start,
        index_len,
    })
}
