use memtable::{Entry, Memtable};

use crate::error::{Result, TableError};
use crate::SSTable;

/// Boxed scan over one table, as consumed by the merge reader.
pub type EntryIter<'a> = Box<dyn Iterator<Item = Result<Entry>> + 'a>;

/// Operations shared by the mutable memtable and the immutable on-disk
/// tables.
///
/// Only [`Memtable`] accepts writes; calling `upsert` or `delete` on an
/// [`SSTable`] is a programming error and returns
/// [`TableError::Immutable`].
pub trait Table {
    /// Ascending entries with key `>= from`, tombstones included.
    fn scan_from<'a>(&'a self, from: &[u8]) -> Result<EntryIter<'a>>;

    fn upsert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    fn delete(&mut self, key: Vec<u8>) -> Result<()>;

    /// Accounted bytes for a memtable, file length for an SSTable.
    fn size(&self) -> u64;
}

impl Table for Memtable {
    fn scan_from<'a>(&'a self, from: &[u8]) -> Result<EntryIter<'a>> {
        Ok(Box::new(
            Memtable::scan_from(self, from).map(Ok::<Entry, TableError>),
        ))
    }

    fn upsert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        Memtable::upsert(self, key, value);
        Ok(())
    }

    fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        Memtable::delete(self, key);
        Ok(())
    }

    fn size(&self) -> u64 {
        Memtable::size(self)
    }
}

impl Table for SSTable {
    fn scan_from<'a>(&'a self, from: &[u8]) -> Result<EntryIter<'a>> {
        Ok(Box::new(SSTable::scan_from(self, from)?))
    }

    fn upsert(&mut self, _key: Vec<u8>, _value: Vec<u8>) -> Result<()> {
        log::error!("upsert attempted on immutable table {}", self.path().display());
        Err(TableError::Immutable(self.path().to_path_buf()))
    }

    fn delete(&mut self, _key: Vec<u8>) -> Result<()> {
        log::error!("delete attempted on immutable table {}", self.path().display());
        Err(TableError::Immutable(self.path().to_path_buf()))
    }

    fn size(&self) -> u64 {
        SSTable::size(self)
    }
}
