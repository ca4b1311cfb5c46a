mod entry;

use std::collections::BTreeMap;
use std::ops::Bound;

pub use entry::{now_millis, Entry, VersionedValue};

/// The mutable, in-memory table that absorbs every write.
///
/// Keys are unique; each maps to its latest [`VersionedValue`] (possibly a
/// tombstone). The table carries the version number the engine assigned it
/// and an approximate byte footprint used to decide when to flush.
#[derive(Debug)]
pub struct Memtable {
    map: BTreeMap<Vec<u8>, VersionedValue>,
    size: u64,
    version: u64,
}

impl Memtable {
    pub fn new(version: u64) -> Self {
        Self {
            map: BTreeMap::new(),
            size: 0,
            version,
        }
    }

    /// Insert or replace `key` with a live value stamped with the current time.
    pub fn upsert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.upsert_at(key, value, now_millis());
    }

    /// Insert or replace `key` with a tombstone stamped with the current time.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.delete_at(key, now_millis());
    }

    /// Like [`upsert`](Memtable::upsert) with an explicit timestamp.
    ///
    /// A write older than the stored version is ignored; an equal timestamp
    /// replaces it.
    ///
    /// Size accounting:
    /// - new key: `+ key + value`
    /// - previous tombstone: `+ value`
    /// - previous live value: `+ value - previous value`
    pub fn upsert_at(&mut self, key: Vec<u8>, value: Vec<u8>, timestamp: i64) {
        if self.is_stale(&key, timestamp) {
            return;
        }
        let new_len = value.len() as u64;
        let key_len = key.len() as u64;
        match self.map.insert(key, VersionedValue::live(timestamp, value)) {
            None => self.size += key_len + new_len,
            Some(prev) if prev.is_tombstone() => self.size += new_len,
            Some(prev) => {
                self.size = (self.size + new_len).saturating_sub(prev.payload_len() as u64);
            }
        }
    }

    /// Like [`delete`](Memtable::delete) with an explicit timestamp. Stale
    /// deletes are ignored the same way as stale upserts.
    ///
    /// Size accounting:
    /// - new key: `+ key`
    /// - previous live value: `- previous value`
    /// - previous tombstone: unchanged
    pub fn delete_at(&mut self, key: Vec<u8>, timestamp: i64) {
        if self.is_stale(&key, timestamp) {
            return;
        }
        let key_len = key.len() as u64;
        match self.map.insert(key, VersionedValue::tombstone(timestamp)) {
            None => self.size += key_len,
            Some(prev) if prev.is_tombstone() => {}
            Some(prev) => {
                self.size = self.size.saturating_sub(prev.payload_len() as u64);
            }
        }
    }

    fn is_stale(&self, key: &[u8], timestamp: i64) -> bool {
        matches!(self.map.get(key), Some(old) if old.timestamp > timestamp)
    }

    /// Ascending entries with `key >= from`, tombstones included.
    ///
    /// The iterator borrows the table, so it observes the table exactly as it
    /// was when the scan started. Call again to restart.
    pub fn scan_from<'a>(&'a self, from: &[u8]) -> impl Iterator<Item = Entry> + 'a {
        self.map
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded))
            .map(|(k, v)| Entry::new(k.clone(), v.clone()))
    }

    /// Live payload for `key`, `None` if absent or deleted.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.map.get(key).and_then(|v| v.value.as_deref())
    }

    /// Raw version for `key`, tombstones included.
    pub fn get_entry(&self, key: &[u8]) -> Option<&VersionedValue> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.map.contains_key(key)
    }

    /// Ordered iterator over entries (key, VersionedValue)
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &VersionedValue)> {
        self.map.iter()
    }

    /// Accounted footprint in bytes. Only an approximation of the serialized
    /// size, used to trigger flushes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests;
