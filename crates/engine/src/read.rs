//! Read path: `get()`.

use anyhow::Result;
use tracing::warn;

use crate::{valid_key, Db};

impl Db {
    /// Looks up a key in the active user table.
    ///
    /// The table searches its memtable first, then its segments
    /// newest-first; a tombstone anywhere ends the search with `None`.
    ///
    /// With no active table, or a key outside the 1..=255 byte range, the
    /// call logs a warning and returns `None` — not-found is a value, not
    /// an error.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(user) = self.user.as_ref() else {
            warn!("no active user table, get returns nothing");
            return Ok(None);
        };
        if !valid_key(key) {
            warn!(len = key.len(), "key length out of range 1..=255, get returns nothing");
            return Ok(None);
        }
        user.get(key)
    }
}
