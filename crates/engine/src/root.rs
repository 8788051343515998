//! Root-file read/write.
//!
//! The root file is the database entry point. It persists exactly one
//! thing: the master table's segment list.
//!
//! ```text
//! [version tag: 8][n: i64 LE] ([path_len: u8][path bytes])^n
//! ```
//!
//! A freshly created database is a bare version tag; a tag-only file reads
//! as an empty list. Rewrites go through a temp file + rename so the root
//! is never half-written, and the parent directory is fsynced so the
//! rename itself is durable.

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use config::{FORMAT_VERSION, VER_SZ};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

/// Reads the master segment list from the root file, creating the file
/// (bare version tag) if it does not exist yet.
pub(crate) fn read_root(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        let mut f = File::create(path)
            .with_context(|| format!("failed to create root file {}", path.display()))?;
        f.write_all(&FORMAT_VERSION)?;
        f.sync_all()?;
        return Ok(Vec::new());
    }

    let f = File::open(path)
        .with_context(|| format!("failed to open root file {}", path.display()))?;
    let mut r = BufReader::new(f);

    let mut tag = [0u8; VER_SZ];
    r.read_exact(&mut tag)
        .with_context(|| format!("root file {} shorter than version tag", path.display()))?;
    if tag != FORMAT_VERSION {
        bail!("bad version tag in root file {}", path.display());
    }

    // a database created and never closed holds only the tag
    let n = match r.read_i64::<LittleEndian>() {
        Ok(n) => n,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if n < 0 {
        bail!("corrupt root file {}: negative segment count {}", path.display(), n);
    }

    let mut segments = Vec::with_capacity(n as usize);
    for i in 0..n {
        let len = r.read_u8().with_context(|| {
            format!("corrupt root file {}: segment #{} truncated", path.display(), i)
        })? as usize;
        let mut bytes = vec![0u8; len];
        r.read_exact(&mut bytes).with_context(|| {
            format!("corrupt root file {}: segment #{} truncated", path.display(), i)
        })?;
        let segment = String::from_utf8(bytes).map_err(|_| {
            anyhow::anyhow!(
                "corrupt root file {}: segment #{} is not UTF-8",
                path.display(),
                i
            )
        })?;
        segments.push(segment);
    }

    Ok(segments)
}

/// Rewrites the root file with the master's current segment list.
///
/// Writes to `<root>.tmp`, fsyncs, renames over the root, then fsyncs the
/// parent directory. Must run *before* the master WAL is truncated.
pub(crate) fn write_root(path: &Path, segments: &[String]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("root");
    let tmp_path = path.with_file_name(format!("{}.tmp", file_name));

    {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .with_context(|| format!("failed to create root tmp {}", tmp_path.display()))?;

        f.write_all(&FORMAT_VERSION)?;
        f.write_i64::<LittleEndian>(segments.len() as i64)?;
        for segment in segments {
            if segment.is_empty() || segment.len() > u8::MAX as usize {
                bail!("segment path length {} out of range 1..=255", segment.len());
            }
            f.write_u8(segment.len() as u8)?;
            f.write_all(segment.as_bytes())?;
        }
        f.flush()?;
        f.sync_all()?;
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to move root file into place at {}", path.display()))?;

    // make the rename itself durable
    if let Some(parent) = path.parent() {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
