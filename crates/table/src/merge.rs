//! Compaction: merging on-disk segments back into the memtable.
//!
//! The algorithm walks the segment list from the head (newest) and keeps
//! merging while the combined footprint of the memtable and the next
//! segment stays under the flush threshold. Each merge is the classic
//! two-pointer merge over two ordered streams; on a key collision the
//! memtable side wins — it is always the newer of the two. Tombstones are
//! preserved: they may still shadow records in segments that were *not*
//! merged.
//!
//! Merged segment files are **not** unlinked here. The master table (or the
//! root file, for the master itself) may still list them, and a crash
//! between the unlink and the upstream list update would leave the database
//! unopenable. [`Table::compact`] only retires them from the segment list;
//! the owner deletes the files once the shrunken list is durable upstream.

use anyhow::{Context, Result};
use memtable::Memtable;
use sstable::SegmentRecord;
use tracing::debug;
use wal::{WalRecord, WalWriter};

use crate::Table;

impl Table {
    /// Merges head segments into the memtable while they fit under the
    /// flush threshold.
    ///
    /// Called at close and safe to call opportunistically. Every merged
    /// record is re-appended to the WAL, so the merged state replays if the
    /// process dies before the next flush.
    ///
    /// Returns the paths of the merged (now retired) segments, head first.
    /// Their files are left on disk: the caller must unlink them only
    /// *after* recording the shrunken segment list upstream, so that a
    /// crash in between still finds every listed segment present.
    pub fn compact(&mut self) -> Result<Vec<String>> {
        debug!(table = %self.name, "compacting");
        let mut retired = Vec::new();
        loop {
            let fits = match self.segments.first() {
                Some(head) => {
                    (self.estimated_segment_size() + head.record_area_size() as usize)
                        < self.max_segment_size
                }
                None => false,
            };
            if !fits {
                break;
            }

            let segment = self.segments.remove(0);
            let path = segment.path().display().to_string();
            let older = segment
                .read_all()
                .with_context(|| format!("failed to read segment {} for compaction", path))?;
            self.merge_records(older)?;

            self.segment_paths.remove(&path);
            debug!(table = %self.name, segment = %path, "merged segment");
            retired.push(path);
        }
        Ok(retired)
    }

    /// Two-pointer merge of the memtable (newer) with one segment's records
    /// (older), replacing the memtable with the merged result.
    fn merge_records(&mut self, older: Vec<SegmentRecord>) -> Result<()> {
        let newer = std::mem::take(&mut self.mem);
        let mut result = Memtable::new();
        let wal = &mut self.wal;

        let mut a = newer.iter().peekable();
        let mut b = older.iter().peekable();

        loop {
            match (a.peek(), b.peek()) {
                (Some((a_key, _)), Some(b_rec)) => match a_key.cmp(&b_rec.key.as_slice()) {
                    std::cmp::Ordering::Less => {
                        let (key, value) = a.next().expect("peeked");
                        emit(wal, &mut result, key, value)?;
                    }
                    std::cmp::Ordering::Greater => {
                        let rec = b.next().expect("peeked");
                        emit(wal, &mut result, &rec.key, rec.value.as_deref())?;
                    }
                    std::cmp::Ordering::Equal => {
                        // same key on both sides: the memtable is newer and
                        // wins, the segment record is dropped
                        let (key, value) = a.next().expect("peeked");
                        b.next();
                        emit(wal, &mut result, key, value)?;
                    }
                },
                (Some(_), None) => {
                    let (key, value) = a.next().expect("peeked");
                    emit(wal, &mut result, key, value)?;
                }
                (None, Some(_)) => {
                    let rec = b.next().expect("peeked");
                    emit(wal, &mut result, &rec.key, rec.value.as_deref())?;
                }
                (None, None) => break,
            }
        }

        self.mem = result;
        Ok(())
    }
}

/// Writes one merged record to the WAL and the result memtable, keeping the
/// WAL-before-memtable ordering even during compaction.
fn emit(
    wal: &mut WalWriter,
    result: &mut Memtable,
    key: &[u8],
    value: Option<&[u8]>,
) -> Result<()> {
    match value {
        Some(v) => {
            wal.append(&WalRecord::Insert {
                key: key.to_vec(),
                value: v.to_vec(),
            })?;
            result.insert(key.to_vec(), v.to_vec());
        }
        None => {
            wal.append(&WalRecord::Delete { key: key.to_vec() })?;
            result.delete(key);
        }
    }
    Ok(())
}
