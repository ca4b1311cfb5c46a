use memtable::{Entry, Memtable};
use std::ffi::OsString;
use std::fs::{rename, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TableError};
use crate::format::{write_row, write_trailer};

/// Path of the temporary file a table is written to before being renamed
/// into place: the final file name with `.tmp` appended.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("table"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes sorted entries to disk as an immutable SSTable file.
///
/// The writer is stateless. The write is crash-safe: data goes to a
/// temporary file next to the target, is fsynced, and is then atomically
/// renamed to the final path. A reader can therefore never observe a
/// partially written table under its final name.
pub struct SSTableWriter {}

impl SSTableWriter {
    /// Serializes every entry of `mem` (tombstones included) to `path`.
    ///
    /// An empty memtable produces a valid zero-row table. Returns the number
    /// of rows written.
    pub fn write_from_memtable(path: &Path, mem: &Memtable) -> Result<usize> {
        let iter = mem.iter().map(|(k, v)| Ok(Entry::new(k.clone(), v.clone())));
        Self::write_internal(path, iter)
    }

    /// Writes an SSTable from a stream of entries.
    ///
    /// This is the compaction entry point: entries are consumed one at a time
    /// and written straight to disk, so memory use is bounded by the offset
    /// array rather than the data.
    ///
    /// The stream must yield keys in strictly ascending order. The first
    /// error it yields aborts the write, removes the temporary file and is
    /// returned unchanged.
    pub fn write_from_iterator<I>(path: &Path, iter: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Entry>>,
    {
        Self::write_internal(path, iter.into_iter())
    }

    fn write_internal<I>(path: &Path, iter: I) -> Result<usize>
    where
        I: Iterator<Item = Result<Entry>>,
    {
        let tmp = tmp_path(path);
        match Self::write_tmp(path, &tmp, iter) {
            Ok(rows) => {
                // Atomically move into place
                if let Err(e) = rename(&tmp, path) {
                    let _ = std::fs::remove_file(&tmp);
                    return Err(e.into());
                }
                sync_parent_dir(path);
                log::debug!("wrote {} rows to {}", rows, path.display());
                Ok(rows)
            }
            Err(e) => {
                let _ = std::fs::remove_file(&tmp);
                Err(e)
            }
        }
    }

    fn write_tmp<I>(path: &Path, tmp: &Path, iter: I) -> Result<usize>
    where
        I: Iterator<Item = Result<Entry>>,
    {
        let raw_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp)?;
        let mut file = BufWriter::new(raw_file);

        // Row offsets, kept in memory until the trailer is written.
        let mut offsets: Vec<u64> = Vec::new();
        let mut position: u64 = 0;
        let mut last_key: Option<Vec<u8>> = None;

        for entry in iter {
            let entry = entry?;
            if last_key.as_deref().is_some_and(|prev| prev >= entry.key.as_slice()) {
                return Err(TableError::OutOfOrder {
                    path: path.to_path_buf(),
                    row: offsets.len(),
                });
            }
            offsets.push(position);
            position += write_row(&mut file, &entry)?;
            last_key = Some(entry.key);
        }

        if offsets.len() > i32::MAX as usize {
            return Err(TableError::TooManyRows(offsets.len()));
        }

        write_trailer(&mut file, &offsets)?;

        // Flush BufWriter, then sync the underlying file
        file.flush()?;
        file.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        Ok(offsets.len())
    }
}

/// Fsyncs the parent directory so the rename itself survives a crash.
/// Best effort: not every platform lets a directory be opened for syncing.
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = std::fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}
