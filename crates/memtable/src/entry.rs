//! Versioned entry model shared by the memtable, the on-disk tables and the
//! merge reader.
//!
//! The ordering rules here are what every other component relies on:
//!
//! * keys compare as unsigned bytes, ascending;
//! * two versions of the **same** key compare by timestamp, **newest first**.
//!
//! A merged stream sorted by [`Entry`] therefore places the most recent write
//! of each key in front of all older ones, whichever table they came from.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Highest timestamp handed out so far in this process.
static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
///
/// The result never goes backwards within one process: if the system clock
/// steps back, the last issued timestamp is returned again instead.
pub fn now_millis() -> i64 {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    let prev = LAST_TIMESTAMP.fetch_max(wall, AtomicOrdering::SeqCst);
    prev.max(wall)
}

/// A single version of a key: creation time plus an optional payload.
///
/// `value == None` is a tombstone. The tombstone flag and the payload can
/// never disagree because the flag *is* the absence of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub timestamp: i64,
    pub value: Option<Vec<u8>>,
}

impl VersionedValue {
    /// A live value written at `timestamp`.
    pub fn live(timestamp: i64, value: Vec<u8>) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }

    /// A deletion marker written at `timestamp`.
    pub fn tombstone(timestamp: i64) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    /// Payload length in bytes, `0` for tombstones.
    pub fn payload_len(&self) -> usize {
        self.value.as_ref().map_or(0, |v| v.len())
    }
}

impl Ord for VersionedValue {
    /// Larger timestamp sorts first. Equal timestamps fall back to
    /// tombstone-first, then payload bytes, so the order agrees with `Eq`.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| match (&self.value, &other.value) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for VersionedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A key together with one of its versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: VersionedValue,
}

impl Entry {
    pub fn new(key: Vec<u8>, value: VersionedValue) -> Self {
        Self { key, value }
    }

    pub fn live(key: Vec<u8>, timestamp: i64, value: Vec<u8>) -> Self {
        Self::new(key, VersionedValue::live(timestamp, value))
    }

    pub fn tombstone(key: Vec<u8>, timestamp: i64) -> Self {
        Self::new(key, VersionedValue::tombstone(timestamp))
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_tombstone()
    }

    /// Compares key ascending, then timestamp descending, ignoring payloads.
    ///
    /// This is the order the merge reader uses; two entries that are
    /// `Equal` here are versions of the same key written in the same
    /// millisecond.
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| other.value.timestamp.cmp(&self.value.timestamp))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
