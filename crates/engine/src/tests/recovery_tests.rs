use super::helpers::{count_sst_files, open_small};
use crate::{metalog, Engine};
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

// --------------------- Close ---------------------

#[test]
fn close_writes_counter_and_level_lines() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = open_small(dir.path());

    for k in 1..=6 {
        engine.put(k, k)?;
    }
    engine.close()?;

    let log = fs::read_to_string(engine.db_dir().join(metalog::METALOG_FILENAME))?;
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines[0], "counter,2");
    assert_eq!(lines.len(), 2, "one counter line plus one live sst");
    assert!(lines[1].starts_with("1,"), "merged sst lives at level 1");
    assert!(lines[1].ends_with("sst_1_2.sst"));
    Ok(())
}

#[test]
fn close_flushes_the_memtable_residue() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = open_small(dir.path());

    engine.put(1, 10)?;
    engine.close()?;

    assert_eq!(count_sst_files(engine.db_dir()), 1);
    Ok(())
}

#[test]
fn close_clears_in_memory_state() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = open_small(dir.path());

    for k in 1..=7 {
        engine.put(k, k)?;
    }
    engine.close()?;

    assert_eq!(engine.memtable_len(), 0);
    assert_eq!(engine.num_levels(), 1);
    assert!(engine.level_files(0).is_empty());
    Ok(())
}

// --------------------- Open ---------------------

#[test]
fn open_creates_a_missing_directory() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("brand_new");
    assert!(!db.exists());

    let engine = Engine::open(&db, 3)?;
    assert!(db.exists());
    assert_eq!(engine.get(1)?, None);
    Ok(())
}

#[test]
fn open_without_log_starts_empty() -> Result<()> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("db"))?;

    let engine = open_small(dir.path());
    assert_eq!(engine.sstable_count(), 0);
    assert_eq!(engine.sst_counter(), 0);
    Ok(())
}

#[test]
fn open_rejects_a_corrupt_log() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("db");
    fs::create_dir(&db)?;
    fs::write(db.join(metalog::METALOG_FILENAME), "bogus first line\n")?;

    assert!(Engine::open(&db, 3).is_err());
    Ok(())
}

// --------------------- Round trips ---------------------

#[test]
fn reopen_restores_levels_and_counter() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("db");

    {
        let mut engine = Engine::open(&db, 3)?;
        for k in 1..=6 {
            engine.put(k, k * 2)?;
        }
        engine.put(7, 70)?; // stays in the memtable until close
        engine.close()?;
    }

    let mut engine = Engine::open(&db, 3)?;
    assert_eq!(engine.sst_counter(), 3, "counter must survive the log");
    for k in 1..=6 {
        assert_eq!(engine.get(k)?, Some(k * 2));
    }
    assert_eq!(engine.get(7)?, Some(70));

    // The restored counter keeps suffixes monotonic: the next flush is
    // sst_4, which joins sst_3 and cascades all the way to level 2.
    engine.put(8, 80)?;
    engine.flush()?;
    assert_eq!(engine.sst_counter(), 4);
    assert!(db.join("sst_2_4.sst").exists());
    for k in 1..=8 {
        assert!(engine.get(k)?.is_some(), "key {} lost in cascade", k);
    }
    Ok(())
}

#[test]
fn reopen_reproduces_the_exact_live_set() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("db");

    {
        let mut engine = Engine::open(&db, 3)?;
        for k in 1..=20 {
            engine.put(k, k * 7)?;
        }
        engine.del(5)?;
        engine.del(13)?;
        engine.close()?;
    }

    let engine = Engine::open(&db, 3)?;
    let expected: Vec<(i64, i64)> = (1..=20)
        .filter(|k| *k != 5 && *k != 13)
        .map(|k| (k, k * 7))
        .collect();
    assert_eq!(engine.scan(1, 20)?, expected);
    Ok(())
}

#[test]
fn drop_publishes_like_close() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("db");

    {
        let mut engine = Engine::open(&db, 3)?;
        engine.put(42, 4200)?;
        // Dropped without close.
    }

    let engine = Engine::open(&db, 3)?;
    assert_eq!(engine.get(42)?, Some(4200));
    Ok(())
}

#[test]
fn scenario_f_thousand_keys_survive_reopen() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("db");

    {
        let mut engine = Engine::open(&db, 3)?;
        for i in 1..=1024 {
            engine.put(i, i)?;
        }
        engine.close()?;
    }

    let mut engine = Engine::open(&db, 3)?;
    for i in 1..=1024 {
        assert_eq!(engine.get(i)?, Some(i), "key {} after reopen", i);
    }

    engine.set_use_btree(true);
    for i in (1..=1024).step_by(41) {
        assert_eq!(engine.get(i)?, Some(i), "key {} via btree", i);
    }

    assert_eq!(engine.scan(1, 1024)?.len(), 1024);
    Ok(())
}
