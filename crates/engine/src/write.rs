//! Write path: `put()`, `delete()`, and the flush chains for both table
//! levels.
//!
//! All mutations flow through this module. Each write goes WAL-first into
//! the active user table; when the user memtable outgrows the threshold the
//! flush chain runs: new user segment -> segment list INSERTed into the
//! master -> user WAL truncated. A master overflow chains one level higher:
//! new master segment -> root file rewritten -> master WAL truncated.

use anyhow::Result;
use table::encode_segment_paths;
use tracing::warn;

use crate::{root, valid_key, Db};

impl Db {
    /// Inserts or updates a record in the active user table.
    ///
    /// Usage errors — no active table, empty or over-long key — are logged
    /// at WARN and ignored; they do not fail the call.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        {
            let Some(user) = self.user.as_mut() else {
                warn!("no active user table, ignoring put");
                return Ok(());
            };
            if !valid_key(key) {
                warn!(len = key.len(), "key length out of range 1..=255, ignoring put");
                return Ok(());
            }
            user.insert(key, value)?;
            if !user.needs_flush() {
                return Ok(());
            }
        }
        self.flush_user()
    }

    /// Deletes a record from the active user table (writes a tombstone).
    ///
    /// The same usage-error policy as [`put`](Db::put) applies.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        {
            let Some(user) = self.user.as_mut() else {
                warn!("no active user table, ignoring delete");
                return Ok(());
            };
            if !valid_key(key) {
                warn!(len = key.len(), "key length out of range 1..=255, ignoring delete");
                return Ok(());
            }
            user.delete(key)?;
            if !user.needs_flush() {
                return Ok(());
            }
        }
        self.flush_user()
    }

    /// Flushes the active user table and records its new segment list in
    /// the master, then truncates the user WAL.
    pub(crate) fn flush_user(&mut self) -> Result<()> {
        let (name, paths) = {
            let user = self.user.as_mut().expect("active user table");
            if user.flush()?.is_none() {
                return Ok(());
            }
            (user.name().to_string(), user.segment_paths())
        };

        // master first: a crash before the truncation below replays the
        // user WAL, a crash after it finds the segments via the master
        self.register_user_segments(&name, &paths)?;

        self.user
            .as_mut()
            .expect("active user table")
            .truncate_wal()?;
        Ok(())
    }

    /// Serializes a user table's segment-path list and INSERTs it into the
    /// master under the table's name.
    pub(crate) fn register_user_segments(&mut self, name: &str, paths: &[String]) -> Result<()> {
        let value = encode_segment_paths(paths)?;
        self.master_insert(name.as_bytes(), &value)
    }

    /// Master-level insert with the master's own flush chain.
    pub(crate) fn master_insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.master.insert(key, value)?;
        if self.master.needs_flush() {
            self.flush_master()?;
        }
        Ok(())
    }

    /// Registers a table name in the master (CREATE_TABLE, empty value).
    pub(crate) fn master_create(&mut self, name: &str) -> Result<()> {
        self.master.create(name.as_bytes())?;
        if self.master.needs_flush() {
            self.flush_master()?;
        }
        Ok(())
    }

    /// Flushes the master table, rewrites the root file with its new
    /// segment list, then truncates the master WAL.
    pub(crate) fn flush_master(&mut self) -> Result<()> {
        if self.master.flush()?.is_some() {
            root::write_root(&self.root_path, &self.master.segment_paths())?;
            self.master.truncate_wal()?;
        }
        Ok(())
    }
}
