use crate::{Backend, SSTable, SSTableWriter};
use anyhow::Result;
use memtable::{Entry, Memtable};
use std::path::Path;


const BACKENDS: [Backend; 2] = [Backend::Mmap, Backend::Pread];

/// Memtable with a live `a`, a tombstone `b` and a live `c`.
pub(crate) fn sample_memtable() -> Memtable {
    let mut m = Memtable::new(1);
    m.upsert_at(b"a".to_vec(), b"x".to_vec(), 1);
    m.delete_at(b"b".to_vec(), 2);
    m.upsert_at(b"c".to_vec(), b"y".to_vec(), 3);
    m
}

/// Writes `entries` (already sorted) to `dir/name` and opens the result.
pub(crate) fn write_table(
    dir: &Path,
    name: &str,
    entries: Vec<Entry>,
    backend: Backend,
) -> Result<SSTable> {
    let path = dir.join(name);
    SSTableWriter::write_from_iterator(&path, entries.into_iter().map(Ok))?;
    Ok(SSTable::open(&path, backend)?)
}

pub(crate) fn keys(entries: &[Entry]) -> Vec<&[u8]> {
    entries.iter().map(|e| e.key.as_slice()).collect()
}
