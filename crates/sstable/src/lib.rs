//! # SSTable - Sorted String Table
//!
//! Immutable, on-disk tables for the StrataKV storage engine, plus the merge
//! reader that combines them with the live [`memtable::Memtable`].
//!
//! When the memtable grows past its flush threshold the engine serializes it
//! as an SSTable. SSTables are *write-once, read-many*: once created they are
//! never modified, only deleted by compaction after their contents have been
//! folded into a newer table.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ DATA REGION (rows in ascending entry order)                   │
//! │                                                               │
//! │ key_len (i64) | key | timestamp (i64) | tombstone (u8)        │
//! │ [val_len (i64) | val]      <- only when tombstone == 0        │
//! │                                                               │
//! │ ... repeated for each row ...                                 │
//! ├───────────────────────────────────────────────────────────────┤
//! │ OFFSET ARRAY                                                  │
//! │                                                               │
//! │ offset (i64) per row, byte position of the row from the       │
//! │ start of the file, ascending                                  │
//! ├───────────────────────────────────────────────────────────────┤
//! │ ROW COUNT (i32, always the last 4 bytes)                      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. A reader finds everything from the tail:
//! the row count locates the offset array, and the offset array bounds the
//! data region. Rows are self-describing, so any row (or just its key) can be
//! parsed from its offset without touching its neighbours; this is what the
//! binary search in [`SSTable::scan_from`] relies on.
//!
//! ## Backends
//!
//! | Backend | Access pattern                                          |
//! |---------|---------------------------------------------------------|
//! | `Mmap`  | whole file mapped once, keys compared in place           |
//! | `Pread` | one file handle, each key / row read with seek + read    |
//!
//! Both produce identical entries; the choice only affects performance.

mod backend;
mod error;
mod format;
mod merge;
mod reader;
mod table;
mod writer;

pub use config::Backend;
pub use error::{Result, TableError};
pub use format::{OFFSET_BYTES, ROW_COUNT_BYTES};
pub use merge::MergeIterator;
pub use reader::{SSTable, SSTableIter};
pub use table::{EntryIter, Table};
pub use writer::{tmp_path, SSTableWriter};

#[cfg(test)]
mod tests;
