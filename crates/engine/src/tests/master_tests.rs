use super::count_segment_files;
use crate::Db;
use anyhow::Result;
use byteorder::{LittleEndian, ReadBytesExt};
use config::{FORMAT_VERSION, VER_SZ};
use std::io::{Cursor, Read};
use tempfile::tempdir;

fn read_root_segments(path: &std::path::Path) -> (Vec<u8>, Vec<String>) {
    let bytes = std::fs::read(path).unwrap();
    let mut r = Cursor::new(&bytes);
    let mut tag = [0u8; VER_SZ];
    r.read_exact(&mut tag).unwrap();
    let mut segments = Vec::new();
    if let Ok(n) = r.read_i64::<LittleEndian>() {
        for _ in 0..n {
            let len = r.read_u8().unwrap() as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf).unwrap();
            segments.push(String::from_utf8(buf).unwrap());
        }
    }
    (tag.to_vec(), segments)
}

// --------------------- Root file ---------------------

#[test]
fn fresh_database_creates_tagged_root_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");
    let db = Db::open(&path)?;
    drop(db);

    let (tag, _) = read_root_segments(&path);
    assert_eq!(tag, FORMAT_VERSION);
    Ok(())
}

#[test]
fn close_records_master_segments_in_root() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    let mut db = Db::open(&path)?;
    db.use_table("t")?;
    db.put(b"k", b"v")?;
    db.close()?;

    // closing flushed the user table, registered it in the master, and
    // flushed the master: the root must now list the master's segment
    let (_, segments) = read_root_segments(&path);
    assert!(!segments.is_empty(), "root file lists no master segments");
    for segment in &segments {
        assert!(
            std::path::Path::new(segment).exists(),
            "root lists missing segment {}",
            segment
        );
    }
    Ok(())
}

#[test]
fn master_wal_is_truncated_after_close() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    let mut db = Db::open(&path)?;
    db.use_table("t")?;
    db.put(b"k", b"v")?;
    db.close()?;

    let master_wal = dir.path().join("master.wal");
    assert_eq!(std::fs::metadata(&master_wal)?.len(), VER_SZ as u64);
    Ok(())
}

#[test]
fn corrupt_root_tag_fails_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x.kv");
    std::fs::write(&path, b"not-a-database").unwrap();
    assert!(Db::open(&path).is_err());
}

// --------------------- Master flush chain ---------------------

#[test]
fn many_tables_overflow_the_master() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    // a tiny threshold so registrations alone overflow the master memtable
    let mut db = Db::open_with_max_segment_size(&path, 192)?;
    for i in 0..12u32 {
        db.use_table(&format!("table-{:02}", i))?;
        db.put(b"k", b"0123456789")?;
    }
    db.close()?;

    // every table must still resolve through master segments + root file
    let mut db = Db::open_with_max_segment_size(&path, 192)?;
    for i in 0..12u32 {
        db.use_table(&format!("table-{:02}", i))?;
        assert_eq!(
            db.get(b"k")?,
            Some(b"0123456789".to_vec()),
            "table-{:02} lost its data",
            i
        );
    }
    db.close()?;
    Ok(())
}

#[test]
fn segment_files_use_random_letter_names() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    let mut db = Db::open(&path)?;
    db.use_table("t")?;
    db.put(b"k", b"v")?;
    db.close()?;

    // at least the user segment and the master segment
    assert!(count_segment_files(dir.path()) >= 2);
    Ok(())
}
