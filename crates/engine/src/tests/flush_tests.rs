use super::count_segment_files;
use crate::Db;
use anyhow::Result;
use tempfile::tempdir;

// --------------------- Threshold-driven flushing ---------------------

#[test]
fn bulk_load_produces_many_segments_and_keeps_every_key() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    // ~1KB records against a 10KB threshold: roughly one segment per ten
    // records, 34+ segments over the whole load
    let mut db = Db::open_with_max_segment_size(&path, 10_000)?;
    db.use_table("bulk")?;
    for i in 0..340u32 {
        let key = format!("key-{:016}", i);
        let value = vec![b'v'; 1_000];
        db.put(key.as_bytes(), &value)?;
    }

    assert!(
        count_segment_files(dir.path()) >= 34,
        "expected at least 34 flushed segments, found {}",
        count_segment_files(dir.path())
    );

    for i in 0..340u32 {
        let key = format!("key-{:016}", i);
        assert_eq!(
            db.get(key.as_bytes())?.as_deref(),
            Some(vec![b'v'; 1_000].as_slice()),
            "lost {}",
            key
        );
    }
    db.close()?;

    // and again through a fresh handle
    let mut db = Db::open_with_max_segment_size(&path, 10_000)?;
    db.use_table("bulk")?;
    for i in (0..340u32).step_by(17) {
        let key = format!("key-{:016}", i);
        assert!(db.get(key.as_bytes())?.is_some(), "lost {} after reopen", key);
    }
    db.close()?;
    Ok(())
}

#[test]
fn flush_truncates_the_user_wal() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    let mut db = Db::open_with_max_segment_size(&path, 128)?;
    db.use_table("t")?;
    for i in 0..20u32 {
        db.put(format!("key{:03}", i).as_bytes(), b"0123456789")?;
    }

    // after at least one flush the WAL must be smaller than the data written
    let wal_len = std::fs::metadata(dir.path().join("t.wal"))?.len();
    assert!(
        wal_len < 20 * 16,
        "user WAL not truncated after flush ({} bytes)",
        wal_len
    );
    db.close()?;
    Ok(())
}

#[test]
fn updates_across_segments_resolve_to_newest() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    let mut db = Db::open_with_max_segment_size(&path, 128)?;
    db.use_table("t")?;
    // rewrite the same key across several flush cycles, with filler keys
    // forcing the flushes
    for round in 0..5u32 {
        db.put(b"target", format!("round-{}", round).as_bytes())?;
        for i in 0..8u32 {
            db.put(format!("fill-{}-{:02}", round, i).as_bytes(), b"xxxxxxxxxx")?;
        }
    }

    assert_eq!(db.get(b"target")?, Some(b"round-4".to_vec()));
    db.close()?;

    let mut db = Db::open_with_max_segment_size(&path, 128)?;
    db.use_table("t")?;
    assert_eq!(db.get(b"target")?, Some(b"round-4".to_vec()));
    db.close()?;
    Ok(())
}

#[test]
fn delete_of_flushed_value_holds_across_flushes() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    let mut db = Db::open_with_max_segment_size(&path, 128)?;
    db.use_table("t")?;
    db.put(b"victim", b"value")?;
    for i in 0..10u32 {
        db.put(format!("fillA{:02}", i).as_bytes(), b"0123456789")?;
    }
    // the victim now lives in a segment
    db.delete(b"victim")?;
    for i in 0..10u32 {
        db.put(format!("fillB{:02}", i).as_bytes(), b"0123456789")?;
    }
    // and its tombstone lives in a newer segment

    assert_eq!(db.get(b"victim")?, None);
    db.close()?;

    let mut db = Db::open_with_max_segment_size(&path, 128)?;
    db.use_table("t")?;
    assert_eq!(db.get(b"victim")?, None);
    db.close()?;
    Ok(())
}

// --------------------- Close-time compaction ---------------------

#[test]
fn close_compacts_small_segments() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    // produce a handful of small segments
    let mut db = Db::open_with_max_segment_size(&path, 128)?;
    db.use_table("t")?;
    for i in 0..30u32 {
        db.put(format!("key{:03}", i).as_bytes(), b"0123456789")?;
    }
    let before = count_segment_files(dir.path());
    assert!(before >= 3);
    db.close()?;

    // reopening with a large threshold lets close-time compaction merge
    // them; the data must be intact either way
    let mut db = Db::open(&path)?;
    db.use_table("t")?;
    for i in 0..30u32 {
        assert_eq!(
            db.get(format!("key{:03}", i).as_bytes())?,
            Some(b"0123456789".to_vec())
        );
    }
    db.close()?;

    let after = count_segment_files(dir.path());
    assert!(
        after < before,
        "close with a roomy threshold should merge segments ({} -> {})",
        before,
        after
    );
    Ok(())
}
