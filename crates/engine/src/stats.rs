//! Read-only diagnostics for operators.

use std::fmt;
use std::path::PathBuf;

use crate::Engine;

/// One on-disk table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub version: u64,
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

/// Snapshot of the engine's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub version: u64,
    pub memtable_version: u64,
    pub memtable_bytes: u64,
    pub memtable_entries: usize,
    pub flush_threshold: u64,
    /// Newest first.
    pub tables: Vec<TableStats>,
}

impl EngineStats {
    pub fn total_table_bytes(&self) -> u64 {
        self.tables.iter().map(|t| t.bytes).sum()
    }

    pub fn total_table_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "memtable v{}: {} entries, {} / {} bytes",
            self.memtable_version, self.memtable_entries, self.memtable_bytes, self.flush_threshold
        )?;
        write!(
            f,
            "sstables: {} ({} rows, {} bytes)",
            self.tables.len(),
            self.total_table_rows(),
            self.total_table_bytes()
        )?;
        for t in &self.tables {
            write!(f, "\n  v{}: {} rows, {} bytes", t.version, t.rows, t.bytes)?;
        }
        Ok(())
    }
}

impl Engine {
    /// Current memtable and table metadata. Never touches row data.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            version: self.version,
            memtable_version: self.mem.version(),
            memtable_bytes: self.mem.size(),
            memtable_entries: self.mem.len(),
            flush_threshold: self.flush_threshold,
            tables: self
                .tables
                .iter()
                .map(|t| TableStats {
                    version: t.version,
                    path: t.table.path().to_path_buf(),
                    rows: t.table.len(),
                    bytes: t.table.size(),
                })
                .collect(),
        }
    }
}
