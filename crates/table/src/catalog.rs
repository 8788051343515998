//! The segment-path-list value codec.
//!
//! The master table maps user-table names to the serialized list of that
//! table's segment paths, newest first:
//!
//! ```text
//! [n: i64 LE] ([path_len: u8][path bytes])*
//! ```
//!
//! An *empty* value is legal and means "the table exists but has no flushed
//! segments yet" — that is what a CREATE_TABLE registration leaves behind.

use anyhow::{bail, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use config::SEG_NUM_SZ;
use std::io::Cursor;

/// Serializes a segment-path list, newest first.
///
/// # Errors
///
/// Fails if any path exceeds the 255-byte length prefix.
pub fn encode_segment_paths(paths: &[String]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(SEG_NUM_SZ + paths.iter().map(|p| p.len() + 1).sum::<usize>());
    out.write_i64::<LittleEndian>(paths.len() as i64)?;
    for path in paths {
        if path.is_empty() || path.len() > u8::MAX as usize {
            bail!("segment path length {} out of range 1..=255", path.len());
        }
        out.write_u8(path.len() as u8)?;
        out.extend_from_slice(path.as_bytes());
    }
    Ok(out)
}

/// Decodes a segment-path list. An empty input decodes to an empty list.
///
/// # Errors
///
/// Fails on a count that disagrees with the payload, a path that is not
/// UTF-8, or trailing bytes.
pub fn decode_segment_paths(value: &[u8]) -> Result<Vec<String>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }

    let mut r = Cursor::new(value);
    let n = r.read_i64::<LittleEndian>()?;
    if n < 0 {
        bail!("corrupt segment list: negative path count {}", n);
    }

    let mut paths = Vec::with_capacity(n as usize);
    for i in 0..n {
        let len = r.read_u8()? as usize;
        let mut bytes = vec![0u8; len];
        std::io::Read::read_exact(&mut r, &mut bytes)
            .map_err(|_| anyhow::anyhow!("corrupt segment list: path #{} truncated", i))?;
        let path = String::from_utf8(bytes)
            .map_err(|_| anyhow::anyhow!("corrupt segment list: path #{} is not UTF-8", i))?;
        paths.push(path);
    }

    if (r.position() as usize) != value.len() {
        bail!(
            "corrupt segment list: {} trailing bytes",
            value.len() - r.position() as usize
        );
    }

    Ok(paths)
}
