//! Row and trailer encoding.
//!
//! ## Row
//!
//! ```text
//! [key_len: i64 BE][key][timestamp: i64 BE][tombstone: u8]
//! [val_len: i64 BE][val]   <- present only when tombstone == 0
//! ```
//!
//! ## Trailer
//!
//! ```text
//! [offset_0: i64 BE] ... [offset_n-1: i64 BE][row_count: i32 BE]
//! ```
//!
//! Decoding works on byte slices and never panics: every length is checked
//! against the slice before it is used. Errors are plain strings; the caller
//! attaches the file path.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use memtable::{Entry, VersionedValue};
use std::io::{Result as IoResult, Write};

/// Size of the trailing row count.
pub const ROW_COUNT_BYTES: u64 = 4;

/// Size of one entry in the offset array.
pub const OFFSET_BYTES: u64 = 8;

/// Smallest possible row: key_len + timestamp + tombstone flag.
pub(crate) const MIN_ROW_BYTES: u64 = 8 + 8 + 1;

pub(crate) type ParseResult<T> = std::result::Result<T, String>;

/// Writes one row and returns the number of bytes written.
pub(crate) fn write_row<W: Write>(w: &mut W, entry: &Entry) -> IoResult<u64> {
    w.write_i64::<BigEndian>(entry.key.len() as i64)?;
    w.write_all(&entry.key)?;
    w.write_i64::<BigEndian>(entry.value.timestamp)?;
    match &entry.value.value {
        Some(v) => {
            w.write_u8(0)?;
            w.write_i64::<BigEndian>(v.len() as i64)?;
            w.write_all(v)?;
        }
        None => {
            w.write_u8(1)?;
        }
    }
    Ok(row_len(entry))
}

/// Encoded length of a row.
pub(crate) fn row_len(entry: &Entry) -> u64 {
    let value = match &entry.value.value {
        Some(v) => 8 + v.len() as u64,
        None => 0,
    };
    MIN_ROW_BYTES + entry.key.len() as u64 + value
}

/// Writes the offset array and row count.
pub(crate) fn write_trailer<W: Write>(w: &mut W, offsets: &[u64]) -> IoResult<()> {
    for &offset in offsets {
        w.write_i64::<BigEndian>(offset as i64)?;
    }
    w.write_i32::<BigEndian>(offsets.len() as i32)?;
    Ok(())
}

/// Bounds-checked reader over one encoded row.
struct RowCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RowCursor<'a> {
    fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn take(&mut self, n: usize, what: &str) -> ParseResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                format!(
                    "{} at byte {} runs past the data region ({} bytes)",
                    what,
                    self.pos,
                    self.buf.len()
                )
            })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn i64(&mut self, what: &str) -> ParseResult<i64> {
        Ok(BigEndian::read_i64(self.take(8, what)?))
    }

    fn len(&mut self, what: &str) -> ParseResult<usize> {
        let n = self.i64(what)?;
        usize::try_from(n).map_err(|_| format!("negative {}: {}", what, n))
    }

    fn flag(&mut self) -> ParseResult<bool> {
        match self.take(1, "tombstone flag")?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(format!("invalid tombstone flag {}", other)),
        }
    }
}

/// Borrows the key of the row starting at `offset` without reading the value.
pub(crate) fn decode_key(data: &[u8], offset: usize) -> ParseResult<&[u8]> {
    let mut cur = RowCursor::at(data, offset);
    let key_len = cur.len("key length")?;
    cur.take(key_len, "key")
}

/// Materializes the row starting at `offset`.
pub(crate) fn decode_row(data: &[u8], offset: usize) -> ParseResult<Entry> {
    let mut cur = RowCursor::at(data, offset);
    let key_len = cur.len("key length")?;
    let key = cur.take(key_len, "key")?.to_vec();
    let timestamp = cur.i64("timestamp")?;
    let value = if cur.flag()? {
        VersionedValue::tombstone(timestamp)
    } else {
        let val_len = cur.len("value length")?;
        VersionedValue::live(timestamp, cur.take(val_len, "value")?.to_vec())
    };
    Ok(Entry::new(key, value))
}

/// Layout derived from the file tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Trailer {
    pub row_count: usize,
    /// Start of the offset array, which is also the end of the data region.
    pub offsets_start: u64,
}

/// Locates the offset array from the file length and the trailing row count.
pub(crate) fn parse_trailer(file_len: u64, row_count: i32) -> ParseResult<Trailer> {
    let row_count = usize::try_from(row_count)
        .map_err(|_| format!("negative row count {}", row_count))?;
    let trailer_len = (row_count as u64)
        .checked_mul(OFFSET_BYTES)
        .and_then(|n| n.checked_add(ROW_COUNT_BYTES))
        .ok_or_else(|| format!("row count {} overflows", row_count))?;
    if trailer_len > file_len {
        return Err(format!(
            "row count {} needs {} trailer bytes but the file has {}",
            row_count, trailer_len, file_len
        ));
    }
    Ok(Trailer {
        row_count,
        offsets_start: file_len - trailer_len,
    })
}

/// Decodes and validates the offset array: every offset must be strictly
/// greater than the previous one and leave room for at least a minimal row
/// before the end of the data region.
pub(crate) fn decode_offsets(raw: &[u8], data_len: u64) -> ParseResult<Vec<u64>> {
    let mut offsets = Vec::with_capacity(raw.len() / OFFSET_BYTES as usize);
    let mut prev: Option<u64> = None;
    for (row, chunk) in raw.chunks_exact(OFFSET_BYTES as usize).enumerate() {
        let offset = BigEndian::read_i64(chunk);
        let offset = u64::try_from(offset)
            .map_err(|_| format!("row {} has negative offset {}", row, offset))?;
        if offset + MIN_ROW_BYTES > data_len {
            return Err(format!(
                "row {} offset {} is outside the data region ({} bytes)",
                row, offset, data_len
            ));
        }
        if prev.is_some_and(|p| offset <= p) {
            return Err(format!("row {} offset {} is not ascending", row, offset));
        }
        prev = Some(offset);
        offsets.push(offset);
    }
    Ok(offsets)
}
