/// Compaction: folds the memtable and every SSTable into a single SSTable.
///
/// Uses [`MergeIterator`] in its live mode, so each key keeps only its newest
/// version and keys whose newest version is a tombstone disappear. The merge
/// streams straight into the writer; memory use is bounded by the offset
/// array of the new table, not by the data volume.
use anyhow::{Context, Result};
use memtable::Memtable;
use sstable::{MergeIterator, SSTable, SSTableWriter};
use std::path::PathBuf;

use crate::{catalog, open_tables, Engine};

impl Engine {
    /// Compacts the memtable and all SSTables into one new SSTable.
    ///
    /// This is a no-op when there are no tables and the memtable is empty.
    ///
    /// # Steps
    ///
    /// 1. Merge the memtable and all tables from the empty key, dropping
    ///    shadowed versions and tombstones.
    /// 2. Write the result as `<memtable version>.sst`.
    /// 3. Release and delete every previous table file.
    /// 4. Re-list the directory; it must now hold exactly the new table.
    /// 5. Start an empty memtable at `version + 1`.
    ///
    /// Rows keep their original timestamps.
    ///
    /// # Errors
    ///
    /// A merge or write failure leaves the engine untouched. If the directory
    /// cannot be rescanned, or does not hold exactly one table afterwards (an
    /// old file could not be deleted), the engine is poisoned: the error is
    /// returned and every later operation fails.
    pub fn compact(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.tables.is_empty() && self.mem.is_empty() {
            return Ok(());
        }

        let version = self.mem.version();
        let path = catalog::table_path(&self.data_dir, version);
        let inputs = self.tables.len();

        let rows = {
            let sources = self.sources();
            let merge = MergeIterator::over(&sources, b"")
                .context("starting compaction merge")?;
            SSTableWriter::write_from_iterator(&path, merge.live())
                .with_context(|| format!("writing compacted table {}", path.display()))?
        };

        // Make sure the new file is readable before anything is deleted.
        if let Err(e) = SSTable::open(&path, self.backend) {
            let _ = std::fs::remove_file(&path);
            return Err(e).with_context(|| format!("reopening compacted table {}", path.display()));
        }

        // Drop old tables (releases file handles and mappings) before deleting files.
        let old_paths: Vec<PathBuf> = std::mem::take(&mut self.tables)
            .into_iter()
            .map(|t| t.table.path().to_path_buf())
            .collect();
        for p in &old_paths {
            if let Err(e) = std::fs::remove_file(p) {
                log::warn!("could not delete compacted table {}: {}", p.display(), e);
            }
        }

        // The memtable's contents now live in the new file.
        self.mem = Memtable::new(version + 1);
        self.version = version;

        let rescanned = catalog::list_tables(&self.data_dir)
            .and_then(|found| Ok((open_tables(&found, self.backend)?, found)));
        let (tables, found) = match rescanned {
            Ok(loaded) => loaded,
            Err(e) => {
                self.poison(format!("rescan after compaction failed: {:#}", e));
                return Err(e.context("rescanning tables after compaction"));
            }
        };
        self.tables = tables;
        if let Some((highest, _)) = found.first() {
            if *highest > self.version {
                self.version = *highest;
                self.mem = Memtable::new(self.version + 1);
            }
        }

        // Tombstones were dropped from the new table, so any surviving older
        // table would resurrect deleted keys.
        if self.tables.len() != 1 {
            let reason = format!(
                "compaction invariant violated: {} tables after compaction, expected 1",
                self.tables.len()
            );
            self.poison(reason.clone());
            anyhow::bail!(reason);
        }

        log::info!(
            "compacted {} tables into {} ({} rows)",
            inputs,
            path.display(),
            rows
        );
        Ok(())
    }
}
