use super::helpers::BIG;
use crate::Store;
use anyhow::Result;
use config::Config;
use std::thread;
use tempfile::tempdir;

fn store(dir: &std::path::Path, threshold: u64) -> Result<Store> {
    Store::open(&Config::new(dir).with_flush_threshold(threshold))
}

#[test]
fn facade_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let store = store(dir.path(), BIG)?;

    store.put("a", "1")?;
    store.put(b"b".to_vec(), b"2".to_vec())?;
    store.put("c", "3")?;
    store.delete("b")?;

    assert_eq!(store.get(b"a")?, Some(b"1".to_vec()));
    assert_eq!(store.get(b"b")?, None);
    assert_eq!(
        store.scan(b"")?,
        vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"c".to_vec(), b"3".to_vec())
        ]
    );
    assert_eq!(store.scan_range(b"b", b"z")?.len(), 1);

    store.flush()?;
    store.compact()?;
    let stats = store.stats()?;
    assert_eq!(stats.tables.len(), 1);
    assert_eq!(stats.memtable_entries, 0);
    Ok(())
}

#[test]
fn clones_share_one_engine() -> Result<()> {
    let dir = tempdir()?;
    let first = store(dir.path(), BIG)?;
    let second = first.clone();
    first.put("k", "v")?;
    assert_eq!(second.get(b"k")?, Some(b"v".to_vec()));

    second.close()?;
    assert!(first.get(b"k").is_err(), "close is visible through every clone");
    Ok(())
}

#[test]
fn concurrent_writers_and_readers() -> Result<()> {
    let dir = tempdir()?;
    let store = store(dir.path(), 256)?;

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || -> Result<()> {
                for i in 0..100 {
                    store.put(format!("t{}-{:03}", t, i), format!("{}", i))?;
                }
                Ok(())
            })
        })
        .collect();

    let reader = {
        let store = store.clone();
        thread::spawn(move || -> Result<()> {
            for _ in 0..20 {
                let pairs = store.scan(b"")?;
                assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
            }
            Ok(())
        })
    };

    let compactor = {
        let store = store.clone();
        thread::spawn(move || -> Result<()> {
            for _ in 0..5 {
                store.compact()?;
            }
            Ok(())
        })
    };

    for w in writers {
        w.join().expect("writer panicked")?;
    }
    reader.join().expect("reader panicked")?;
    compactor.join().expect("compactor panicked")?;

    assert_eq!(store.scan(b"")?.len(), 400);
    assert_eq!(store.get(b"t3-099")?, Some(b"99".to_vec()));
    store.compact()?;
    assert_eq!(store.stats()?.tables.len(), 1);
    Ok(())
}
