//! Reading segment files: open (header + index), point lookup, full scan.

use anyhow::{bail, Context, Result};
use config::{FLAGS_TOMBSTONE, KEY_LEN_SZ, RECORD_LEN_SZ, RECORD_OVERHEAD};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::format;
use crate::index::SparseIndex;

/// One record read back from a segment. `value` is `None` for tombstones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

/// An open segment: the parsed header and the in-memory sparse index.
///
/// The record area stays on disk. Lookups open the file, read exactly one
/// block, and close it again — the engine is single-threaded and opens
/// segment files on demand per read.
#[derive(Debug)]
pub struct Segment {
    path: PathBuf,
    index: SparseIndex,
    num_records: i64,
    data_start: i64,
    /// Byte size of the record area (file length minus `data_start`).
    record_area: u64,
}

impl Segment {
    /// Opens a segment file: reads the header, materializes the sparse
    /// index, and validates that every index item points inside the file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("failed to open segment {}", path.display()))?;
        let filesize = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let header = format::read_header(&mut reader)
            .with_context(|| format!("corrupt segment {}", path.display()))?;

        if header.data_start as u64 > filesize {
            bail!(
                "corrupt segment {}: data_start {} past end of file ({} bytes)",
                path.display(),
                header.data_start,
                filesize
            );
        }

        let index = SparseIndex::read_from(&mut reader, header.index_len)
            .with_context(|| format!("corrupt segment index in {}", path.display()))?;

        for item in index.items() {
            if item.start_offset < header.data_start || item.end_offset as u64 > filesize {
                bail!(
                    "corrupt segment {}: index item [{}, {}) outside record area [{}, {})",
                    path.display(),
                    item.start_offset,
                    item.end_offset,
                    header.data_start,
                    filesize
                );
            }
        }

        Ok(Self {
            path,
            index,
            num_records: header.num_records,
            data_start: header.data_start,
            record_area: filesize - header.data_start as u64,
        })
    }

    /// Point lookup for a single key.
    ///
    /// Consults the sparse index; on a candidate block, reads exactly
    /// `[start_offset, end_offset)` and scans it linearly. Returns
    /// `Ok(Some(record))` when the key is present — the record may be a
    /// tombstone (`value: None`), which the caller must treat as "deleted,
    /// stop searching older segments". `Ok(None)` means the key is not in
    /// this segment.
    pub fn get(&self, key: &[u8]) -> Result<Option<SegmentRecord>> {
        let (start, end) = match self.index.search(key) {
            Some(range) => range,
            None => return Ok(None),
        };

        let mut file = File::open(&self.path)
            .with_context(|| format!("failed to open segment {}", self.path.display()))?;
        file.seek(SeekFrom::Start(start as u64))?;
        let mut block = vec![0u8; (end - start) as usize];
        file.read_exact(&mut block)
            .with_context(|| format!("short block read in segment {}", self.path.display()))?;

        let mut cursor = BlockCursor::new(&block, &self.path);
        while let Some(record) = cursor.next_record()? {
            if record.key == key {
                return Ok(Some(SegmentRecord {
                    key: record.key.to_vec(),
                    value: if record.tombstone {
                        None
                    } else {
                        Some(record.value.to_vec())
                    },
                }));
            }
        }
        Ok(None)
    }

    /// Reads the entire record area in key order.
    ///
    /// Used by compaction, which merges whole segments into the memtable.
    /// The buffer is bounded by the flush threshold that produced the
    /// segment.
    pub fn read_all(&self) -> Result<Vec<SegmentRecord>> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("failed to open segment {}", self.path.display()))?;
        file.seek(SeekFrom::Start(self.data_start as u64))?;
        let mut area = vec![0u8; self.record_area as usize];
        file.read_exact(&mut area)
            .with_context(|| format!("short record area in segment {}", self.path.display()))?;

        let mut records = Vec::with_capacity(self.num_records as usize);
        let mut cursor = BlockCursor::new(&area, &self.path);
        while let Some(record) = cursor.next_record()? {
            records.push(SegmentRecord {
                key: record.key.to_vec(),
                value: if record.tombstone {
                    None
                } else {
                    Some(record.value.to_vec())
                },
            });
        }

        if records.len() as i64 != self.num_records {
            bail!(
                "corrupt segment {}: header claims {} records, record area holds {}",
                self.path.display(),
                self.num_records,
                records.len()
            );
        }

        Ok(records)
    }

    /// Byte size of the record area; the compaction fit check uses this.
    #[must_use]
    pub fn record_area_size(&self) -> u64 {
        self.record_area
    }

    /// Number of records (tombstones included) per the header.
    #[must_use]
    pub fn num_records(&self) -> i64 {
        self.num_records
    }

    /// Path of the segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory sparse index (test support and diagnostics).
    pub fn index(&self) -> &SparseIndex {
        &self.index
    }
}

/// A borrowed record parsed out of a block buffer.
struct RawRecord<'a> {
    key: &'a [u8],
    tombstone: bool,
    value: &'a [u8],
}

/// Walks serialized records in a byte buffer, validating every length
/// field against the remaining bytes before slicing.
struct BlockCursor<'a> {
    buf: &'a [u8],
    off: usize,
    path: &'a Path,
}

impl<'a> BlockCursor<'a> {
    fn new(buf: &'a [u8], path: &'a Path) -> Self {
        Self { buf, off: 0, path }
    }

    fn next_record(&mut self) -> Result<Option<RawRecord<'a>>> {
        if self.off == self.buf.len() {
            return Ok(None);
        }
        if self.off + RECORD_LEN_SZ > self.buf.len() {
            bail!(
                "corrupt segment {}: dangling {} bytes after last record",
                self.path.display(),
                self.buf.len() - self.off
            );
        }

        let total_size = i32::from_le_bytes(
            self.buf[self.off..self.off + RECORD_LEN_SZ]
                .try_into()
                .expect("4-byte slice"),
        );
        let total = total_size as usize;
        if total_size < (RECORD_OVERHEAD + 1) as i32 || self.off + total > self.buf.len() {
            bail!(
                "corrupt segment {}: record length {} at offset {} overruns block of {} bytes",
                self.path.display(),
                total_size,
                self.off,
                self.buf.len()
            );
        }

        let key_size = self.buf[self.off + RECORD_LEN_SZ] as usize;
        if RECORD_OVERHEAD + key_size > total {
            bail!(
                "corrupt segment {}: key length {} does not fit record of {} bytes",
                self.path.display(),
                key_size,
                total
            );
        }

        let key_start = self.off + RECORD_LEN_SZ + KEY_LEN_SZ;
        let key = &self.buf[key_start..key_start + key_size];
        let flags = self.buf[key_start + key_size];
        let value = &self.buf[key_start + key_size + 1..self.off + total];

        self.off += total;
        Ok(Some(RawRecord {
            key,
            tombstone: flags & FLAGS_TOMBSTONE != 0,
            value,
        }))
    }
}
