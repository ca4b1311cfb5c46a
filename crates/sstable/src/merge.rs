//! K-way merge over a memtable scan and any number of SSTable scans.
//!
//! Produces entries in ascending key order with one entry per key: the most
//! recent version across all sources. Tombstones are kept by the raw
//! iterator so callers can see them; [`MergeIterator::live`] drops them.
//!
//! Reads and compaction both run on this: walk every source in sorted
//! order, keep the newest version of each key, and hand the result to the
//! caller or to [`SSTableWriter`](crate::SSTableWriter).

use memtable::Entry;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::table::{EntryIter, Table};

/// The current head of one source.
struct HeapEntry {
    entry: Entry,
    /// Index into `sources`; lower means higher precedence.
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the smallest key first and, for
        // one key, the newest timestamp first, so reverse the entry order.
        // Same key and timestamp: the lower source index wins.
        other
            .entry
            .recency_cmp(&self.entry)
            .then_with(|| other.source.cmp(&self.source))
    }
}

/// Merges sorted entry streams into a single sorted, deduplicated stream.
///
/// Sources must be passed in precedence order: the memtable first, then
/// SSTables from newest to oldest. Precedence only matters when two sources
/// hold the same key with the same timestamp.
///
/// The iterator is lazy and single-pass. The first error from any source is
/// yielded once, after which the iterator is exhausted.
pub struct MergeIterator<'a> {
    sources: Vec<EntryIter<'a>>,
    heap: BinaryHeap<HeapEntry>,
    done: bool,
}

impl<'a> MergeIterator<'a> {
    /// Creates a merge over already-positioned source iterators, pulling the
    /// first entry of each.
    pub fn new(sources: Vec<EntryIter<'a>>) -> Result<Self> {
        let mut merge = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            done: false,
        };
        for source in 0..merge.sources.len() {
            merge.advance(source)?;
        }
        Ok(merge)
    }

    /// Opens `scan_from(from)` on every table and merges the results.
    pub fn over(tables: &[&'a dyn Table], from: &[u8]) -> Result<Self> {
        let sources = tables
            .iter()
            .map(|t| t.scan_from(from))
            .collect::<Result<Vec<_>>>()?;
        Self::new(sources)
    }

    /// Pulls the next entry of `source` onto the heap.
    fn advance(&mut self, source: usize) -> Result<()> {
        if let Some(next) = self.sources[source].next() {
            self.heap.push(HeapEntry {
                entry: next?,
                source,
            });
        }
        Ok(())
    }

    /// Returns the newest version of the next key, or `None` when every
    /// source is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        let top = match self.heap.pop() {
            Some(top) => top,
            None => return Ok(None),
        };
        self.advance(top.source)?;

        // Older versions of the same key sit right behind it on the heap.
        while let Some(dup) = self.heap.peek() {
            if dup.entry.key != top.entry.key {
                break;
            }
            let source = dup.source;
            self.heap.pop();
            self.advance(source)?;
        }

        Ok(Some(top.entry))
    }

    /// Collects all remaining entries into a `Vec`, tombstones included.
    pub fn collect_all(&mut self) -> Result<Vec<Entry>> {
        let mut result = Vec::new();
        while let Some(entry) = self.next_entry()? {
            result.push(entry);
        }
        Ok(result)
    }

    /// Drops tombstones, leaving only keys whose newest version is live.
    pub fn live(self) -> impl Iterator<Item = Result<Entry>> + 'a {
        self.filter(|item| !matches!(item, Ok(entry) if entry.is_tombstone()))
    }
}

impl Iterator for MergeIterator<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for MergeIterator<'_> {}
