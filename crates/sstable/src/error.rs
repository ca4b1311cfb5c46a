use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while writing or reading an SSTable.
#[derive(Debug, Error)]
pub enum TableError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The file does not follow the table layout (bad row count, offsets
    /// outside the data region, lengths running past the end, ...).
    #[error("corrupt table {}: {}", .path.display(), .reason)]
    Corrupt { path: PathBuf, reason: String },

    /// A write was attempted on an immutable table.
    #[error("table {} is immutable", .0.display())]
    Immutable(PathBuf),

    /// The writer was handed rows that are not in ascending key order.
    #[error("rows out of order at row {row} while writing {}", .path.display())]
    OutOfOrder { path: PathBuf, row: usize },

    /// The row count does not fit the 4-byte trailer.
    #[error("too many rows for one table: {0}")]
    TooManyRows(usize),
}

impl TableError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TableError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
