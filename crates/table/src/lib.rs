//! # Table
//!
//! The central abstraction of UndertowKV: a named key space binding together
//! an in-memory [`Memtable`], an append-only WAL, and an ordered list of
//! immutable on-disk segments (head = newest).
//!
//! ## Write path
//!
//! Every mutation is appended to the WAL **before** the memtable is touched,
//! so a crash between the two still recovers a consistent state. When the
//! memtable's estimated serialized footprint exceeds `max_segment_size`, the
//! owner flushes it: [`Table::flush`] writes a new segment (random 21-letter
//! name) and prepends it to the segment list. WAL truncation is **not** part
//! of the flush — the owner truncates only after the new segment list has
//! been recorded upstream (in the master table, or in the root file for the
//! master itself).
//!
//! ## Read path
//!
//! Memtable first: a live value returns immediately and a tombstone ends the
//! search — it must shadow older segments. Otherwise segments are consulted
//! newest-first, each costing at most one block read via its sparse index.
//!
//! ## Compaction
//!
//! [`Table::compact`] pops segments from the head while the memtable plus
//! the next segment still fit under the threshold, merging each into the
//! memtable with a two-pointer merge (the memtable side is newer and wins
//! ties). Merged records are re-logged to the WAL so the merged state is
//! itself crash-recoverable. Merged segments are retired from the list but
//! their files stay on disk; the owner unlinks them after the shrunken
//! list has been recorded upstream.

mod catalog;
mod merge;

pub use catalog::{decode_segment_paths, encode_segment_paths};

use anyhow::{Context, Result};
use config::{RECORD_OVERHEAD, SEGMENT_NAME_LEN};
use memtable::{Lookup, Memtable};
use rand::Rng;
use sstable::{write_segment, Segment};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use wal::{WalReader, WalRecord, WalWriter};

/// A named key space: memtable + WAL + newest-first segment list.
pub struct Table {
    name: String,
    dir: PathBuf,
    mem: Memtable,
    wal: WalWriter,
    /// Open segments, newest first.
    segments: Vec<Segment>,
    /// Paths of all segments in `segments`, for idempotent tracking.
    segment_paths: HashSet<String>,
    /// Flush threshold: estimated serialized memtable footprint in bytes.
    max_segment_size: usize,
}

impl Table {
    /// Opens a table: replays its WAL (if one exists with content) into a
    /// fresh memtable, opens the WAL for append, and opens every listed
    /// segment, building its sparse index.
    ///
    /// `segment_paths` must be ordered newest first, exactly as stored in
    /// the master table or root file.
    pub fn open(
        name: &str,
        dir: &Path,
        segment_paths: &[String],
        max_segment_size: usize,
    ) -> Result<Self> {
        let wal_path = dir.join(format!("{}.wal", name));

        let mut mem = Memtable::new();
        let wal_len = std::fs::metadata(&wal_path).map(|m| m.len()).unwrap_or(0);
        if wal_len > 0 {
            debug!(table = name, wal = %wal_path.display(), "restoring WAL");
            let mut reader = WalReader::open(&wal_path)
                .with_context(|| format!("failed to open WAL {}", wal_path.display()))?;
            reader
                .replay(|record| apply_record(&mut mem, record))
                .with_context(|| format!("failed to replay WAL {}", wal_path.display()))?;
        }

        let wal = WalWriter::open(&wal_path, false)
            .with_context(|| format!("failed to open WAL {}", wal_path.display()))?;

        let mut segments = Vec::with_capacity(segment_paths.len());
        let mut paths = HashSet::with_capacity(segment_paths.len());
        for path in segment_paths {
            segments.push(
                Segment::open(path)
                    .with_context(|| format!("failed to open segment of table '{}'", name))?,
            );
            paths.insert(path.clone());
        }

        Ok(Self {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            mem,
            wal,
            segments,
            segment_paths: paths,
            max_segment_size,
        })
    }

    /// Inserts or updates a record: WAL append, then memtable insert.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.wal.append(&WalRecord::Insert {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        self.mem.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Registers `key` with an empty value using the CREATE_TABLE WAL
    /// command. The master table uses this to catalog a user-table name
    /// before the table has any segments.
    pub fn create(&mut self, key: &[u8]) -> Result<()> {
        self.wal.append(&WalRecord::CreateTable { name: key.to_vec() })?;
        self.mem.insert(key.to_vec(), Vec::new());
        Ok(())
    }

    /// Deletes a record: WAL append, then a memtable tombstone.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.wal.append(&WalRecord::Delete { key: key.to_vec() })?;
        self.mem.delete(key);
        Ok(())
    }

    /// Looks up a key: memtable, then segments newest-first.
    ///
    /// A memtable or segment tombstone ends the search with `None` — it
    /// shadows every older segment.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.mem.entry(key) {
            Some(Lookup::Value(v)) => return Ok(Some(v.to_vec())),
            Some(Lookup::Tombstone) => return Ok(None),
            None => {}
        }

        for segment in &self.segments {
            if let Some(record) = segment.get(key)? {
                // a tombstone record carries value None
                return Ok(record.value);
            }
        }

        Ok(None)
    }

    /// Estimated serialized footprint of the memtable: live data bytes plus
    /// the per-record field overhead.
    #[must_use]
    pub fn estimated_segment_size(&self) -> usize {
        self.mem.data_size() + self.mem.len() * RECORD_OVERHEAD
    }

    /// `true` when the memtable has outgrown the flush threshold.
    #[must_use]
    pub fn needs_flush(&self) -> bool {
        self.estimated_segment_size() > self.max_segment_size
    }

    /// Writes the memtable to a fresh segment and prepends it to the
    /// segment list. Returns the new segment's path, or `None` when the
    /// memtable held nothing.
    ///
    /// A memtable holding only tombstones is still flushed — dropping it
    /// would resurrect deleted keys from older segments.
    ///
    /// The caller records the updated segment list upstream and only then
    /// truncates the WAL.
    pub fn flush(&mut self) -> Result<Option<String>> {
        if self.mem.is_empty() {
            return Ok(None);
        }

        let path = self.fresh_segment_path();
        write_segment(Path::new(&path), &self.mem)
            .with_context(|| format!("failed to flush table '{}' to {}", self.name, path))?;

        let segment = Segment::open(&path)?;
        self.segments.insert(0, segment);
        self.segment_paths.insert(path.clone());
        self.mem = Memtable::new();

        debug!(table = %self.name, segment = %path, "flushed memtable");
        Ok(Some(path))
    }

    /// Truncates the WAL back to a bare version header.
    ///
    /// Only valid once the memtable state it protected is durable: flushed
    /// to a segment *and* recorded in the master table or root file.
    pub fn truncate_wal(&mut self) -> Result<()> {
        self.wal.truncate()?;
        Ok(())
    }

    /// The table's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Segment paths, newest first — the value stored for this table in the
    /// master table (or the root file, for the master itself).
    pub fn segment_paths(&self) -> Vec<String> {
        self.segments
            .iter()
            .map(|s| s.path().display().to_string())
            .collect()
    }

    /// Number of on-disk segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The in-memory buffer (read-only).
    pub fn memtable(&self) -> &Memtable {
        &self.mem
    }

    /// Generates an unused segment path: [`SEGMENT_NAME_LEN`] random
    /// letters inside the table's directory, no extension.
    fn fresh_segment_path(&self) -> String {
        loop {
            let candidate = self
                .dir
                .join(random_segment_name())
                .display()
                .to_string();
            if !self.segment_paths.contains(&candidate) && !Path::new(&candidate).exists() {
                return candidate;
            }
        }
    }
}

/// Applies one replayed WAL entry to a memtable.
fn apply_record(mem: &mut Memtable, record: WalRecord) {
    match record {
        WalRecord::Insert { key, value } => mem.insert(key, value),
        WalRecord::Delete { key } => {
            mem.delete(&key);
        }
        WalRecord::CreateTable { name } => mem.insert(name, Vec::new()),
    }
}

/// Returns [`SEGMENT_NAME_LEN`] random characters from `[A-Za-z]`.
fn random_segment_name() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::rng();
    (0..SEGMENT_NAME_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests;
