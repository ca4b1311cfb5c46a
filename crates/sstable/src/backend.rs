//! The two ways an [`SSTable`](crate::SSTable) can reach its rows.
//!
//! Both backends validate the trailer and offset array when they are built,
//! so a successfully constructed backend only ever fails later on a row whose
//! own lengths are inconsistent.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use memmap2::Mmap;
use memtable::Entry;
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, TableError};
use crate::format::{
    decode_key, decode_offsets, decode_row, parse_trailer, Trailer, OFFSET_BYTES,
    ROW_COUNT_BYTES,
};

const KEY_LEN_BYTES: usize = 8;

/// Row-level access to one table file.
pub(crate) trait RowSource: Send + Sync {
    fn row_count(&self) -> usize;

    /// Key of row `row`. Must not read the row's value.
    fn key_at(&self, row: usize) -> Result<Cow<'_, [u8]>>;

    fn entry_at(&self, row: usize) -> Result<Entry>;
}

/// Whole-file memory map. Keys are borrowed straight from the mapping and
/// offsets are decoded in place from the mapped offset array.
pub(crate) struct MmapRows {
    path: PathBuf,
    mmap: Mmap,
    trailer: Trailer,
}

impl MmapRows {
    pub(crate) fn open(path: &Path, file: &File) -> Result<Self> {
        if file.metadata()?.len() < ROW_COUNT_BYTES {
            return Err(TableError::corrupt(path, "file too small for row count"));
        }
        // SAFETY: table files are never modified after the rename that
        // publishes them; they are only deleted, and the engine drops every
        // reader before deleting.
        let mmap = unsafe { Mmap::map(file)? };
        let file_len = mmap.len() as u64;
        let row_count = BigEndian::read_i32(&mmap[mmap.len() - ROW_COUNT_BYTES as usize..]);
        let trailer =
            parse_trailer(file_len, row_count).map_err(|r| TableError::corrupt(path, r))?;

        let start = trailer.offsets_start as usize;
        let end = mmap.len() - ROW_COUNT_BYTES as usize;
        decode_offsets(&mmap[start..end], trailer.offsets_start)
            .map_err(|r| TableError::corrupt(path, r))?;

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            trailer,
        })
    }

    fn offset(&self, row: usize) -> usize {
        let at = self.trailer.offsets_start as usize + row * OFFSET_BYTES as usize;
        BigEndian::read_i64(&self.mmap[at..at + OFFSET_BYTES as usize]) as usize
    }

    /// Bytes of row `row`, bounded by the next row's offset.
    fn row_bytes(&self, row: usize) -> &[u8] {
        let start = self.offset(row);
        let end = if row + 1 < self.trailer.row_count {
            self.offset(row + 1)
        } else {
            self.trailer.offsets_start as usize
        };
        &self.mmap[start..end]
    }
}

impl RowSource for MmapRows {
    fn row_count(&self) -> usize {
        self.trailer.row_count
    }

    fn key_at(&self, row: usize) -> Result<Cow<'_, [u8]>> {
        decode_key(self.row_bytes(row), 0)
            .map(Cow::Borrowed)
            .map_err(|r| TableError::corrupt(&self.path, format!("row {}: {}", row, r)))
    }

    fn entry_at(&self, row: usize) -> Result<Entry> {
        decode_row(self.row_bytes(row), 0)
            .map_err(|r| TableError::corrupt(&self.path, format!("row {}: {}", row, r)))
    }
}

/// Positioned reads through a single file handle.
///
/// The offset array is loaded once at open; every key or row access then
/// seeks to the row and reads only the bytes it needs. The handle is wrapped
/// in a `Mutex` so reads work through a shared `&self`.
pub(crate) struct FileRows {
    path: PathBuf,
    file: Mutex<File>,
    offsets: Vec<u64>,
    data_len: u64,
}

impl FileRows {
    pub(crate) fn open(path: &Path, mut file: File) -> Result<Self> {
        let file_len = file.metadata()?.len();
        if file_len < ROW_COUNT_BYTES {
            return Err(TableError::corrupt(path, "file too small for row count"));
        }

        file.seek(SeekFrom::End(-(ROW_COUNT_BYTES as i64)))?;
        let row_count = file.read_i32::<BigEndian>()?;
        let trailer =
            parse_trailer(file_len, row_count).map_err(|r| TableError::corrupt(path, r))?;

        let mut raw = vec![0u8; trailer.row_count * OFFSET_BYTES as usize];
        file.seek(SeekFrom::Start(trailer.offsets_start))?;
        file.read_exact(&mut raw)?;
        let offsets = decode_offsets(&raw, trailer.offsets_start)
            .map_err(|r| TableError::corrupt(path, r))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            offsets,
            data_len: trailer.offsets_start,
        })
    }

    /// Byte range `[offset, end)` that row `row` may occupy.
    fn extent(&self, row: usize) -> (u64, u64) {
        let start = self.offsets[row];
        let end = self.offsets.get(row + 1).copied().unwrap_or(self.data_len);
        (start, end)
    }

    fn corrupt(&self, row: usize, reason: impl std::fmt::Display) -> TableError {
        TableError::corrupt(&self.path, format!("row {}: {}", row, reason))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| TableError::corrupt(&self.path, "file handle lock poisoned"))
    }
}

impl RowSource for FileRows {
    fn row_count(&self) -> usize {
        self.offsets.len()
    }

    fn key_at(&self, row: usize) -> Result<Cow<'_, [u8]>> {
        let (start, end) = self.extent(row);
        let row_len = (end - start) as usize;
        let mut buf = vec![0u8; row_len.min(KEY_LEN_BYTES)];
        {
            let mut f = self.lock()?;
            f.seek(SeekFrom::Start(start))?;
            f.read_exact(&mut buf)?;
            // Just the key when its length fits the row, else the whole row
            // for the decoder to reject.
            let want = if buf.len() < KEY_LEN_BYTES {
                row_len
            } else {
                usize::try_from(BigEndian::read_i64(&buf))
                    .ok()
                    .filter(|&n| n <= row_len - KEY_LEN_BYTES)
                    .map_or(row_len, |n| KEY_LEN_BYTES + n)
            };
            let have = buf.len();
            buf.resize(want, 0);
            f.read_exact(&mut buf[have..])?;
        }
        let key = decode_key(&buf, 0).map_err(|r| self.corrupt(row, r))?;
        Ok(Cow::Owned(key.to_vec()))
    }

    fn entry_at(&self, row: usize) -> Result<Entry> {
        let (start, end) = self.extent(row);
        let mut buf = vec![0u8; (end - start) as usize];
        {
            let mut f = self.lock()?;
            f.seek(SeekFrom::Start(start))?;
            f.read_exact(&mut buf)?;
        }
        decode_row(&buf, 0).map_err(|r| self.corrupt(row, r))
    }
}
