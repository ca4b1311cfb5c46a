//! # Engine - StrataKV Storage Engine
//!
//! The central orchestrator that ties the [`memtable`] and [`sstable`] crates
//! together into a log-structured key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → Memtable upsert / delete           │
//! │              |                                │
//! │              |  (size > flush threshold?)     │
//! │              |            yes                 │
//! │              v                                │
//! │           flush() → new SSTable               │
//! │                                               │
//! │ compaction.rs → all tables + memtable         │
//! │              → one SSTable, no tombstones     │
//! │                                               │
//! │ read.rs → MergeIterator(Memtable, SSTables)   │
//! │            (newest timestamp wins)            │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                                  |
//! |----------------|----------------------------------------------------------|
//! | `lib.rs`       | `Engine` struct, startup, accessors, `close`, `Debug`, `Drop` |
//! | [`catalog`]    | table file names, directory listing, temp file cleanup   |
//! | `write`        | `upsert()`, `delete()`, `flush()`                        |
//! | `read`         | `get_range()`, `get()`, `scan()`                         |
//! | `compaction`   | `compact()`                                              |
//! | [`store`]      | thread-safe `Store` facade                               |
//! | [`stats`]      | `EngineStats` diagnostics                                |
//!
//! ## Versions
//!
//! Every memtable carries a version. A flush writes the memtable to
//! `<version>.sst` and starts a new memtable at `version + 1`, so the live
//! memtable is always newer than every table on disk, and file names are
//! never reused.
//!
//! ## Crash Safety
//!
//! Tables are written to `<name>.sst.tmp`, fsynced, then renamed. A crash
//! leaves either the old table set or the old set plus one complete new
//! table; leftover temp files are removed at startup. Writes that were still
//! in the memtable at the time of a crash are lost: there is no write-ahead
//! log.
pub mod catalog;
mod compaction;
mod read;
pub mod stats;
pub mod store;
mod write;

use anyhow::{Context, Result};
use config::{Backend, Config};
use memtable::Memtable;
use sstable::{SSTable, Table};
use std::path::{Path, PathBuf};

pub use stats::{EngineStats, TableStats};
pub use store::Store;

/// Maximum allowed key size in bytes (64 KiB).
pub const MAX_KEY_SIZE: usize = 64 * 1024;
/// Maximum allowed value size in bytes (10 MiB).
pub const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;

/// An open table together with the version its file name carries.
pub(crate) struct LoadedTable {
    pub(crate) version: u64,
    pub(crate) table: SSTable,
}

/// The storage engine: one memtable plus the immutable tables on disk.
///
/// # Write Path
///
/// 1. Apply the upsert or delete to the memtable, stamped with the current
///    time.
/// 2. If the memtable's accounted size exceeds the flush threshold, flush it
///    to a new SSTable before returning.
///
/// # Read Path
///
/// Merge the memtable and every SSTable; for each key the version with the
/// largest timestamp wins, and keys whose winner is a tombstone are hidden.
///
/// # Concurrency
///
/// Writes, flush and compaction take `&mut self`; reads take `&self` and the
/// iterators they return borrow the engine. A table can therefore never be
/// replaced or deleted while a scan over it is alive. Wrap the engine in a
/// [`Store`] to share it between threads.
pub struct Engine {
    pub(crate) mem: Memtable,
    /// Ordered newest-first.
    pub(crate) tables: Vec<LoadedTable>,
    pub(crate) data_dir: PathBuf,
    pub(crate) backend: Backend,

    /// Version of the newest table generation. The memtable is always at
    /// `version + 1`.
    pub(crate) version: u64,

    /// Memtable byte size above which a write triggers a flush.
    pub(crate) flush_threshold: u64,

    pub(crate) closed: bool,

    /// Set when compaction left the directory in a state the engine cannot
    /// trust. Every later operation fails with this reason.
    pub(crate) poisoned: Option<String>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("data_dir", &self.data_dir)
            .field("backend", &self.backend)
            .field("version", &self.version)
            .field("flush_threshold", &self.flush_threshold)
            .field("memtable_size", &self.mem.size())
            .field("memtable_entries", &self.mem.len())
            .field("sstable_count", &self.tables.len())
            .field("closed", &self.closed)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl Engine {
    /// Opens the engine over `config.data_dir`, loading every table found
    /// there.
    ///
    /// # Startup Steps
    ///
    /// 1. Create the data directory if it does not exist.
    /// 2. Remove leftover `.sst.tmp` files from interrupted writes.
    /// 3. Open every `.sst` file with the configured backend.
    /// 4. Set the version counter to the larger of the highest version found
    ///    and the number of tables, and start an empty memtable one above it.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be read or any table file cannot be
    /// opened. A corrupt table rejects startup rather than being skipped,
    /// because skipping it could resurrect values it had deleted.
    pub fn open(config: &Config) -> Result<Self> {
        let data_dir = config.data_dir.clone();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        catalog::remove_tmp_files(&data_dir)?;

        let found = catalog::list_tables(&data_dir)?;
        let tables = open_tables(&found, config.backend)?;
        let highest = found.first().map_or(0, |(v, _)| *v);
        let version = highest.max(found.len() as u64);

        log::info!(
            "opened {} with {} tables (version {}, backend {})",
            data_dir.display(),
            tables.len(),
            version,
            config.backend
        );

        Ok(Self {
            mem: Memtable::new(version + 1),
            tables,
            data_dir,
            backend: config.backend,
            version,
            flush_threshold: config.flush_threshold,
            closed: false,
            poisoned: None,
        })
    }

    /// Flushes a non-empty memtable and releases every table handle.
    ///
    /// Any further operation on the engine returns an error. Calling `close`
    /// twice is a no-op. A poisoned engine is closed without flushing and
    /// the poison reason is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if let Some(reason) = &self.poisoned {
            let err = anyhow::anyhow!("engine at {} is unusable: {}", self.data_dir.display(), reason);
            self.tables.clear();
            self.closed = true;
            return Err(err);
        }
        self.flush()?;
        self.tables.clear();
        self.closed = true;
        log::info!("closed {}", self.data_dir.display());
        Ok(())
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        anyhow::ensure!(!self.closed, "engine at {} is closed", self.data_dir.display());
        if let Some(reason) = &self.poisoned {
            anyhow::bail!("engine at {} is unusable: {}", self.data_dir.display(), reason);
        }
        Ok(())
    }

    /// Refuses every further operation. Used when the on-disk table set no
    /// longer matches what the engine has logically written.
    pub(crate) fn poison(&mut self, reason: String) {
        log::error!("{}: {}", self.data_dir.display(), reason);
        self.poisoned = Some(reason);
    }

    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Sources for a merge, in precedence order: the memtable, then tables
    /// newest first.
    pub(crate) fn sources(&self) -> Vec<&dyn Table> {
        std::iter::once(&self.mem as &dyn Table)
            .chain(self.tables.iter().map(|t| &t.table as &dyn Table))
            .collect()
    }

    /// Version of the newest table generation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Version of the live memtable, always `version() + 1`.
    #[must_use]
    pub fn memtable_version(&self) -> u64 {
        self.mem.version()
    }

    #[must_use]
    pub fn memtable_size(&self) -> u64 {
        self.mem.size()
    }

    #[must_use]
    pub fn flush_threshold(&self) -> u64 {
        self.flush_threshold
    }

    /// Updates the flush threshold. Takes effect on the next write.
    pub fn set_flush_threshold(&mut self, threshold: u64) {
        self.flush_threshold = threshold;
    }

    #[must_use]
    pub fn sstable_count(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }
}

/// Opens `(version, path)` pairs in the order given.
pub(crate) fn open_tables(found: &[(u64, PathBuf)], backend: Backend) -> Result<Vec<LoadedTable>> {
    found
        .iter()
        .map(|(version, path)| {
            let table = SSTable::open(path, backend)
                .with_context(|| format!("opening table {}", path.display()))?;
            Ok(LoadedTable {
                version: *version,
                table,
            })
        })
        .collect()
}

/// Best-effort flush on drop.
///
/// If the engine is dropped without [`Engine::close`], a non-empty memtable
/// is flushed so its writes survive. Drop cannot propagate errors, so a
/// failure is only logged.
impl Drop for Engine {
    fn drop(&mut self) {
        if self.closed || self.poisoned.is_some() || self.mem.is_empty() {
            return;
        }
        if let Err(e) = self.flush() {
            log::warn!("flush on drop failed for {}: {:#}", self.data_dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests;
