//! Table lifecycle: selecting a user table, closing it, closing the
//! database.

use anyhow::{bail, Context, Result};
use config::MASTER_TABLE_NAME;
use table::{decode_segment_paths, Table};
use tracing::debug;

use crate::{root, valid_key, Db};

impl Db {
    /// Selects (or creates) the named user table, closing any previously
    /// active one first.
    ///
    /// An unknown name is registered in the master via the CREATE_TABLE
    /// command and opened empty. A known name is opened on the segment list
    /// stored in the master, plus its own WAL (`<name>.wal`).
    pub fn use_table(&mut self, name: &str) -> Result<()> {
        if !valid_key(name.as_bytes()) {
            bail!("table name length {} out of range 1..=255", name.len());
        }
        if name == MASTER_TABLE_NAME {
            bail!("table name '{}' is reserved", MASTER_TABLE_NAME);
        }

        if let Some(user) = self.user.take() {
            self.close_user_table(user)?;
        }

        let segments = match self.master.get(name.as_bytes())? {
            None => {
                debug!(table = name, "unknown user table, registering");
                self.master_create(name)?;
                Vec::new()
            }
            Some(value) => decode_segment_paths(&value)?,
        };

        debug!(table = name, segments = segments.len(), "opening user table");
        let table = Table::open(name, &self.dir, &segments, self.max_segment_size)?;
        self.user = Some(table);
        Ok(())
    }

    /// Closes a user table: compact, flush, record the final segment list
    /// in the master, truncate the WAL, and only then unlink the segments
    /// compaction retired. The ordering matters twice over — the master
    /// must know about the new segments before the WAL that could rebuild
    /// them is dropped, and it must have stopped listing the merged ones
    /// before their files disappear.
    pub(crate) fn close_user_table(&mut self, mut user: Table) -> Result<()> {
        debug!(table = %user.name(), "closing user table");
        let retired = user.compact()?;
        user.flush()?;
        if user.segment_count() > 0 {
            let name = user.name().to_string();
            let paths = user.segment_paths();
            self.register_user_segments(&name, &paths)?;
        }
        user.truncate_wal()?;
        remove_segment_files(&retired)?;
        Ok(())
    }

    /// Shared close path for [`Db::close`] and `Drop`.
    pub(crate) fn close_inner(&mut self) -> Result<()> {
        if let Some(user) = self.user.take() {
            self.close_user_table(user)?;
        }

        let retired = self.master.compact()?;
        self.master.flush()?;
        root::write_root(&self.root_path, &self.master.segment_paths())?;
        self.master.truncate_wal()?;
        remove_segment_files(&retired)?;
        debug!(db = %self.root_path.display(), "closed database");
        Ok(())
    }
}

/// Unlinks segments retired by a compaction. Callers must not invoke this
/// until the shrunken segment list has been recorded upstream (master value
/// or root file); until then the old list must stay openable.
fn remove_segment_files(paths: &[String]) -> Result<()> {
    for path in paths {
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove merged segment {}", path))?;
    }
    Ok(())
}
