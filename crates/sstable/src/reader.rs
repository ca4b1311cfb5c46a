use memtable::{Entry, VersionedValue};
use std::cmp::Ordering;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::backend::{FileRows, MmapRows, RowSource};
use crate::error::Result;
use crate::Backend;

/// A read-only view over one table file.
///
/// Only the trailer is validated and (for [`Backend::Pread`]) the offset
/// array loaded at [`open`](SSTable::open); rows are parsed on demand, so an
/// open table costs a file handle plus at most `8 * rows` bytes of memory.
///
/// Reads go through `&self`. Both backends are `Send + Sync`, which lets the
/// engine share open tables between concurrent readers.
pub struct SSTable {
    path: PathBuf,
    file_size: u64,
    backend: Backend,
    rows: Box<dyn RowSource>,
}

impl SSTable {
    /// Opens a table file with the given backend.
    ///
    /// # Errors
    ///
    /// [`TableError::Corrupt`](crate::TableError::Corrupt) if the file is
    /// shorter than the row count, the row count is negative, the offset
    /// array does not fit, or an offset is out of order or outside the data
    /// region. I/O failures are returned as
    /// [`TableError::Io`](crate::TableError::Io).
    pub fn open<P: AsRef<Path>>(path: P, backend: Backend) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        let rows: Box<dyn RowSource> = match backend {
            Backend::Mmap => Box::new(MmapRows::open(path, &file)?),
            Backend::Pread => Box::new(FileRows::open(path, file)?),
        };

        log::debug!(
            "opened {} ({} rows, {} bytes, {})",
            path.display(),
            rows.row_count(),
            file_size,
            backend
        );

        Ok(Self {
            path: path.to_path_buf(),
            file_size,
            backend,
            rows,
        })
    }

    /// Lower-bound search: index of the first row whose key is `>= key`,
    /// or `len()` if every key is smaller.
    fn search(&self, key: &[u8]) -> Result<usize> {
        let mut low = 0usize;
        let mut high = self.rows.row_count();
        while low < high {
            let mid = low + (high - low) / 2;
            match self.rows.key_at(mid)?.as_ref().cmp(key) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Ok(mid),
            }
        }
        Ok(low)
    }

    /// Ascending entries with key `>= from`, tombstones included.
    ///
    /// The starting row is found by binary search before this returns; each
    /// row after it is parsed only when the iterator reaches it.
    pub fn scan_from(&self, from: &[u8]) -> Result<SSTableIter<'_>> {
        let row = self.search(from)?;
        Ok(SSTableIter {
            table: self,
            row,
            failed: false,
        })
    }

    /// Exact lookup. Returns the stored value for `key`, which may be a
    /// tombstone, or `None` if the key is not in this table.
    pub fn get(&self, key: &[u8]) -> Result<Option<VersionedValue>> {
        let row = self.search(key)?;
        if row == self.rows.row_count() {
            return Ok(None);
        }
        let entry = self.rows.entry_at(row)?;
        Ok((entry.key == key).then_some(entry.value))
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.row_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.row_count() == 0
    }

    /// File length in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.file_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }
}

impl std::fmt::Debug for SSTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SSTable")
            .field("path", &self.path)
            .field("rows", &self.rows.row_count())
            .field("size", &self.file_size)
            .field("backend", &self.backend)
            .finish()
    }
}

/// Lazy row iterator returned by [`SSTable::scan_from`].
///
/// A parse error is yielded once, after which the iterator is exhausted.
#[derive(Debug)]
pub struct SSTableIter<'a> {
    table: &'a SSTable,
    row: usize,
    failed: bool,
}

impl Iterator for SSTableIter<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.row >= self.table.rows.row_count() {
            return None;
        }
        let item = self.table.rows.entry_at(self.row);
        self.row += 1;
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let left = self.table.rows.row_count().saturating_sub(self.row);
        (0, Some(left))
    }
}

impl std::iter::FusedIterator for SSTableIter<'_> {}
