use super::*;
use std::cmp::Ordering;

// -------------------- Basic upsert / delete --------------------

#[test]
fn upsert_and_get_single_key() {
    let mut m = Memtable::new(1);
    m.upsert(b"k1".to_vec(), b"v1".to_vec());
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(b"k1"), Some(b"v1".as_slice()));
}

#[test]
fn upsert_replaces_previous_value() {
    let mut m = Memtable::new(1);
    m.upsert(b"k1".to_vec(), b"v1".to_vec());
    m.upsert(b"k1".to_vec(), b"v2".to_vec());
    assert_eq!(m.get(b"k1"), Some(b"v2".as_slice()));
    assert_eq!(m.len(), 1);
}

#[test]
fn get_missing_key_returns_none() {
    let m = Memtable::new(1);
    assert!(m.get(b"nonexistent").is_none());
}

#[test]
fn delete_creates_tombstone() {
    let mut m = Memtable::new(1);
    m.upsert(b"k1".to_vec(), b"v1".to_vec());
    m.delete(b"k1".to_vec());
    assert!(m.get(b"k1").is_none());
    assert_eq!(m.len(), 1); // tombstone still present
    assert!(m.get_entry(b"k1").unwrap().is_tombstone());
}

#[test]
fn upsert_after_delete_resurrects_key() {
    let mut m = Memtable::new(1);
    m.upsert(b"k".to_vec(), b"v1".to_vec());
    m.delete(b"k".to_vec());
    m.upsert(b"k".to_vec(), b"v2".to_vec());
    assert_eq!(m.get(b"k"), Some(b"v2".as_slice()));
}

#[test]
fn explicit_timestamps_are_kept() {
    let mut m = Memtable::new(1);
    m.upsert_at(b"a".to_vec(), b"x".to_vec(), 10);
    m.delete_at(b"b".to_vec(), 20);
    assert_eq!(m.get_entry(b"a"), Some(&VersionedValue::live(10, b"x".to_vec())));
    assert_eq!(m.get_entry(b"b"), Some(&VersionedValue::tombstone(20)));
}

#[test]
fn stale_explicit_writes_are_ignored() {
    let mut m = Memtable::new(1);
    m.upsert_at(b"a".to_vec(), b"new".to_vec(), 20);
    m.upsert_at(b"a".to_vec(), b"old".to_vec(), 10);
    m.delete_at(b"a".to_vec(), 15);
    assert_eq!(m.get_entry(b"a"), Some(&VersionedValue::live(20, b"new".to_vec())));
    assert_eq!(m.size(), 4);

    m.delete_at(b"b".to_vec(), 30);
    m.upsert_at(b"b".to_vec(), b"v".to_vec(), 5);
    assert_eq!(m.get_entry(b"b"), Some(&VersionedValue::tombstone(30)));
    assert_eq!(m.size(), 5);

    // Equal timestamps replace.
    m.upsert_at(b"a".to_vec(), b"same".to_vec(), 20);
    assert_eq!(m.get(b"a"), Some(b"same".as_slice()));
    assert_eq!(m.size(), 6);
}

#[test]
fn version_is_fixed_at_construction() {
    let m = Memtable::new(42);
    assert_eq!(m.version(), 42);
    assert_eq!(Memtable::default().version(), 0);
}

// -------------------- Size accounting --------------------

#[test]
fn size_counts_key_and_value_for_new_key() {
    let mut m = Memtable::new(1);
    assert_eq!(m.size(), 0);
    // key="ab" (2) + value="ccc" (3) = 5
    m.upsert(b"ab".to_vec(), b"ccc".to_vec());
    assert_eq!(m.size(), 5);
}

#[test]
fn size_adds_difference_on_overwrite() {
    let mut m = Memtable::new(1);
    m.upsert(b"a".to_vec(), b"aaa".to_vec()); // 1 + 3
    assert_eq!(m.size(), 4);
    m.upsert(b"a".to_vec(), b"bb".to_vec()); // 3 - 1
    assert_eq!(m.size(), 3);
    m.upsert(b"a".to_vec(), b"cccccc".to_vec()); // + 4
    assert_eq!(m.size(), 7);
}

#[test]
fn size_adds_only_value_over_tombstone() {
    let mut m = Memtable::new(1);
    m.delete(b"key".to_vec()); // 3
    assert_eq!(m.size(), 3);
    m.upsert(b"key".to_vec(), b"vv".to_vec()); // + 2
    assert_eq!(m.size(), 5);
}

#[test]
fn size_subtracts_value_on_delete() {
    let mut m = Memtable::new(1);
    m.upsert(b"a".to_vec(), b"aaa".to_vec()); // 1 + 3
    m.delete(b"a".to_vec()); // value removed, key stays
    assert_eq!(m.size(), 1);
}

#[test]
fn delete_is_idempotent_for_size() {
    let mut m = Memtable::new(1);
    m.upsert(b"k".to_vec(), b"value".to_vec());
    m.delete(b"k".to_vec());
    let after_first = m.size();
    m.delete(b"k".to_vec());
    assert_eq!(m.size(), after_first);

    m.delete(b"fresh".to_vec());
    let fresh = m.size();
    m.delete(b"fresh".to_vec());
    assert_eq!(m.size(), fresh);
}

#[test]
fn size_multiple_keys() {
    let mut m = Memtable::new(1);
    m.upsert(b"a".to_vec(), b"1".to_vec()); // 1+1=2
    m.upsert(b"bb".to_vec(), b"22".to_vec()); // 2+2=4
    m.upsert(b"ccc".to_vec(), b"333".to_vec()); // 3+3=6
    assert_eq!(m.size(), 12);
}

#[test]
fn size_large_value() {
    let mut m = Memtable::new(1);
    m.upsert(b"big".to_vec(), vec![b'x'; 1_000_000]);
    assert_eq!(m.size(), 3 + 1_000_000);
}

// -------------------- scan_from --------------------

#[test]
fn scan_from_empty_key_yields_everything_sorted() {
    let mut m = Memtable::new(1);
    m.upsert(b"c".to_vec(), b"3".to_vec());
    m.upsert(b"a".to_vec(), b"1".to_vec());
    m.upsert(b"b".to_vec(), b"2".to_vec());

    let keys: Vec<Vec<u8>> = m.scan_from(b"").map(|e| e.key).collect();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn scan_from_starts_at_lower_bound() {
    let mut m = Memtable::new(1);
    for k in [b"b", b"d", b"f"] {
        m.upsert(k.to_vec(), b"v".to_vec());
    }
    let first = |from: &[u8]| m.scan_from(from).next().map(|e| e.key);
    assert_eq!(first(b"a"), Some(b"b".to_vec()));
    assert_eq!(first(b"d"), Some(b"d".to_vec()));
    assert_eq!(first(b"e"), Some(b"f".to_vec()));
    assert_eq!(first(b"g"), None);
}

#[test]
fn scan_from_includes_tombstones() {
    let mut m = Memtable::new(1);
    m.upsert(b"a".to_vec(), b"1".to_vec());
    m.delete(b"b".to_vec());
    m.upsert(b"c".to_vec(), b"3".to_vec());

    let entries: Vec<Entry> = m.scan_from(b"").collect();
    assert_eq!(entries.len(), 3);
    assert!(entries[1].is_tombstone());
}

#[test]
fn scan_from_is_restartable() {
    let mut m = Memtable::new(1);
    m.upsert(b"a".to_vec(), b"1".to_vec());
    m.upsert(b"b".to_vec(), b"2".to_vec());
    assert_eq!(m.scan_from(b"").count(), 2);
    assert_eq!(m.scan_from(b"").count(), 2);
}

#[test]
fn scan_uses_unsigned_byte_order() {
    let mut m = Memtable::new(1);
    m.upsert(vec![0xFF], b"hi".to_vec());
    m.upsert(vec![0x01], b"lo".to_vec());
    m.upsert(vec![0x80, 0x00], b"mid".to_vec());
    let keys: Vec<Vec<u8>> = m.scan_from(b"").map(|e| e.key).collect();
    assert_eq!(keys, vec![vec![0x01], vec![0x80, 0x00], vec![0xFF]]);
}

// -------------------- Entry ordering --------------------

#[test]
fn newer_version_of_same_key_sorts_first() {
    let old = Entry::live(b"k".to_vec(), 1, b"old".to_vec());
    let new = Entry::live(b"k".to_vec(), 2, b"new".to_vec());
    assert!(new < old);
    assert_eq!(new.recency_cmp(&old), Ordering::Less);

    let del = Entry::tombstone(b"k".to_vec(), 3);
    assert!(del < new);
}

#[test]
fn key_order_dominates_timestamp() {
    let a = Entry::live(b"a".to_vec(), 1, b"x".to_vec());
    let b = Entry::live(b"b".to_vec(), 100, b"y".to_vec());
    assert!(a < b);
}

#[test]
fn recency_cmp_ignores_payload() {
    let a = Entry::live(b"k".to_vec(), 5, b"x".to_vec());
    let b = Entry::live(b"k".to_vec(), 5, b"y".to_vec());
    assert_eq!(a.recency_cmp(&b), Ordering::Equal);
    assert_ne!(a.cmp(&b), Ordering::Equal);
}

#[test]
fn tombstone_has_no_payload() {
    let v = VersionedValue::tombstone(7);
    assert!(v.is_tombstone());
    assert_eq!(v.payload_len(), 0);
    assert!(!VersionedValue::live(7, Vec::new()).is_tombstone());
}

#[test]
fn clock_never_goes_backwards() {
    let mut last = now_millis();
    for _ in 0..1_000 {
        let ts = now_millis();
        assert!(ts >= last);
        last = ts;
    }
}

#[test]
fn successive_writes_get_non_decreasing_timestamps() {
    let mut m = Memtable::new(1);
    m.upsert(b"a".to_vec(), b"1".to_vec());
    m.upsert(b"b".to_vec(), b"2".to_vec());
    let ta = m.get_entry(b"a").unwrap().timestamp;
    let tb = m.get_entry(b"b").unwrap().timestamp;
    assert!(tb >= ta);
}

// -------------------- Edge cases --------------------

#[test]
fn empty_key_and_value() {
    let mut m = Memtable::new(1);
    m.upsert(b"".to_vec(), b"".to_vec());
    assert_eq!(m.get(b""), Some(b"".as_slice()));
    assert_eq!(m.size(), 0);
}

#[test]
fn alternating_upsert_delete() {
    let mut m = Memtable::new(1);
    for _ in 0..1_000 {
        m.upsert(b"k".to_vec(), b"v".to_vec());
        m.delete(b"k".to_vec());
    }
    assert!(m.get(b"k").is_none());
    assert_eq!(m.len(), 1);
    assert_eq!(m.size(), 1);
}
