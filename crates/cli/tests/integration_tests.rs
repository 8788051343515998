//! End-to-end tests driving the full database surface the way an embedding
//! program would.

use anyhow::Result;
use engine::Db;
use tempfile::tempdir;

#[test]
fn basic_session_and_reopen() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    let mut db = Db::open(&path)?;
    db.use_table("t")?;
    db.put(b"alice", b"bob")?;
    assert_eq!(db.get(b"alice")?, Some(b"bob".to_vec()));
    db.close()?;

    let mut db = Db::open(&path)?;
    db.use_table("t")?;
    assert_eq!(db.get(b"alice")?, Some(b"bob".to_vec()));
    db.close()?;
    Ok(())
}

#[test]
fn update_then_delete_reads_as_absent() -> Result<()> {
    let dir = tempdir()?;
    let mut db = Db::open(dir.path().join("x.kv"))?;
    db.use_table("t")?;
    db.put(b"k", b"v1")?;
    db.put(b"k", b"v2")?;
    db.delete(b"k")?;
    assert_eq!(db.get(b"k")?, None);
    db.close()?;
    Ok(())
}

#[test]
fn several_tables_with_mixed_workloads() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    let mut db = Db::open_with_max_segment_size(&path, 4_096)?;
    for table in ["users", "sessions", "metallica"] {
        db.use_table(table)?;
        for i in 0..100u32 {
            db.put(
                format!("{}-key-{:04}", table, i).as_bytes(),
                format!("{}-value-{}", table, i).as_bytes(),
            )?;
        }
        for i in (0..100u32).step_by(3) {
            db.delete(format!("{}-key-{:04}", table, i).as_bytes())?;
        }
    }
    db.close()?;

    let mut db = Db::open_with_max_segment_size(&path, 4_096)?;
    for table in ["users", "sessions", "metallica"] {
        db.use_table(table)?;
        for i in 0..100u32 {
            let key = format!("{}-key-{:04}", table, i);
            let got = db.get(key.as_bytes())?;
            if i % 3 == 0 {
                assert_eq!(got, None, "{} should be deleted", key);
            } else {
                assert_eq!(
                    got,
                    Some(format!("{}-value-{}", table, i).into_bytes()),
                    "{} lost",
                    key
                );
            }
        }
    }
    db.close()?;
    Ok(())
}

#[test]
fn binary_payloads_survive_the_whole_stack() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("x.kv");

    let key = vec![0x00, 0xFF, 0x7F, 0x80];
    let value: Vec<u8> = (0..=255).collect();

    let mut db = Db::open(&path)?;
    db.use_table("bin")?;
    db.put(&key, &value)?;
    db.close()?;

    let mut db = Db::open(&path)?;
    db.use_table("bin")?;
    assert_eq!(db.get(&key)?, Some(value));
    db.close()?;
    Ok(())
}
