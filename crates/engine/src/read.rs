/// Read path: `get_range()`, `get()` and `scan()`.
///
/// Range reads run a [`MergeIterator`] over the memtable and every SSTable,
/// which yields the newest version of each key in ascending order; keys whose
/// newest version is a tombstone are dropped. Point lookups apply the same
/// recency rule without the merge.
use anyhow::Result;
use memtable::{Entry, VersionedValue};
use sstable::MergeIterator;

use crate::Engine;

/// Live `(key, value)` pairs in ascending key order.
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + 'a>;

fn into_pair(entry: Entry) -> Option<(Vec<u8>, Vec<u8>)> {
    let Entry { key, value } = entry;
    value.value.map(|v| (key, v))
}

impl Engine {
    /// Lazily yields every live key `>= from` with its newest value.
    ///
    /// The iterator borrows the engine, so no write, flush or compaction can
    /// run until it is dropped.
    pub fn get_range(&self, from: &[u8]) -> Result<KvIter<'_>> {
        self.ensure_open()?;
        let sources = self.sources();
        let merge = MergeIterator::over(&sources, from)?;
        Ok(Box::new(merge.live().filter_map(|item| match item {
            Ok(entry) => into_pair(entry).map(Ok),
            Err(e) => Some(Err(anyhow::Error::from(e))),
        })))
    }

    /// Returns the newest live value of `key`, or `None` if it was never
    /// written or its newest version is a tombstone.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;

        // Same precedence as the merge: larger timestamp wins, and on a tie
        // the earlier source (memtable, then newer tables) wins.
        let mut best: Option<VersionedValue> = self.mem.get_entry(key).cloned();
        for loaded in &self.tables {
            if let Some(found) = loaded.table.get(key)? {
                if best.as_ref().map_or(true, |b| found.timestamp > b.timestamp) {
                    best = Some(found);
                }
            }
        }
        Ok(best.and_then(|v| v.value))
    }

    /// Collects live pairs with `start <= key < end`. An empty `end` means no
    /// upper bound.
    pub fn scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut result = Vec::new();
        for item in self.get_range(start)? {
            let (key, value) = item?;
            if !end.is_empty() && key.as_slice() >= end {
                break;
            }
            result.push((key, value));
        }
        Ok(result)
    }
}
