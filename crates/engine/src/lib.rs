//! # Engine - the UndertowKV database facade
//!
//! Ties the [`table`] crate's Table abstraction into a complete embedded
//! key-value store with a two-level table hierarchy.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                     Db                        │
//! │                                               │
//! │ use_table() ──> master lookup ──> user Table  │
//! │                                               │
//! │ put/delete ──> user WAL ──> user memtable     │
//! │                  │                            │
//! │                  │ (threshold exceeded?)      │
//! │                  v                            │
//! │            user flush ──> new segment         │
//! │                  │                            │
//! │                  v                            │
//! │   segment list INSERTed into MASTER table     │
//! │                  │                            │
//! │                  │ (master threshold?)        │
//! │                  v                            │
//! │   master flush ──> segment + ROOT file        │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The **master table** is an ordinary [`Table`] whose keys are user-table
//! names and whose values encode each table's segment-path list. The **root
//! file** is the entry point: it persists only the master's own segment
//! list, closing the recursion.
//!
//! ## Module responsibilities
//!
//! | Module       | Purpose                                             |
//! |--------------|-----------------------------------------------------|
//! | `lib.rs`     | `Db` struct, open, accessors, `Drop`                |
//! | [`tables`]   | `use_table`, user-table close, database close       |
//! | [`write`]    | `put()`, `delete()`, flush chains for both levels   |
//! | [`read`]     | `get()`                                             |
//! | [`root`]     | root-file read/write (atomic rewrite)               |
//!
//! ## Crash safety
//!
//! Four orderings, enforced here and in the `table` crate, make the on-disk
//! state recoverable at every instant: WAL append before memtable mutation;
//! segment fsync before WAL truncation; master update before user WAL
//! truncation; root update before master WAL truncation. On restart the
//! union of (segments on disk) and (WAL records replayed in order) equals
//! the acknowledged state.

mod read;
mod root;
mod tables;
mod write;

use anyhow::Result;
use config::{KEY_MAX_LEN, MASTER_TABLE_NAME, MAX_SEG_SIZE};
use std::path::{Path, PathBuf};
use table::Table;
use tracing::debug;

/// An open UndertowKV database: root file, master table, and at most one
/// active user table.
///
/// Single-writer and strictly single-threaded — callers must not share a
/// `Db` across threads or invoke operations concurrently.
pub struct Db {
    root_path: PathBuf,
    /// Directory holding every WAL and segment file: the root file's parent.
    dir: PathBuf,
    master: Table,
    user: Option<Table>,
    max_segment_size: usize,
    closed: bool,
}

impl Db {
    /// Opens (or creates) the database at `path` with the default flush
    /// threshold.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_max_segment_size(path, MAX_SEG_SIZE)
    }

    /// Opens (or creates) the database at `path` with an explicit memtable
    /// flush threshold in bytes.
    ///
    /// Reads the root file (creating it with a bare version tag if absent)
    /// and recovers the master table from its segment list and its WAL.
    pub fn open_with_max_segment_size<P: AsRef<Path>>(
        path: P,
        max_segment_size: usize,
    ) -> Result<Self> {
        let root_path = path.as_ref().to_path_buf();
        let dir = root_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();

        let master_segments = root::read_root(&root_path)?;
        debug!(
            db = %root_path.display(),
            master_segments = master_segments.len(),
            "opening database"
        );
        let master = Table::open(MASTER_TABLE_NAME, &dir, &master_segments, max_segment_size)?;

        Ok(Self {
            root_path,
            dir,
            master,
            user: None,
            max_segment_size,
            closed: false,
        })
    }

    /// Closes the database: the active user table is compacted, flushed and
    /// registered; the master is compacted and flushed; the root file is
    /// rewritten.
    pub fn close(mut self) -> Result<()> {
        let result = self.close_inner();
        self.closed = true;
        result
    }

    /// Name of the active user table, if one is selected.
    pub fn active_table(&self) -> Option<&str> {
        self.user.as_ref().map(Table::name)
    }

    /// Path of the root file.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// The configured flush threshold in bytes.
    #[must_use]
    pub fn max_segment_size(&self) -> usize {
        self.max_segment_size
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("root_path", &self.root_path)
            .field("active_table", &self.active_table())
            .field("master_segments", &self.master.segment_count())
            .field("max_segment_size", &self.max_segment_size)
            .finish()
    }
}

/// Best-effort close on drop.
///
/// Errors are ignored because `Drop` cannot propagate them — anything that
/// fails to flush here is still in the WALs and replays on the next open.
impl Drop for Db {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close_inner();
        }
    }
}

/// Keys are length-prefixed with one byte and must not be empty.
pub(crate) fn valid_key(key: &[u8]) -> bool {
    !key.is_empty() && key.len() <= KEY_MAX_LEN
}

#[cfg(test)]
mod tests;
