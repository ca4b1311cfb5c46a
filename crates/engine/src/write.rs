/// Write path: `upsert()`, `delete()` and `flush()`.
///
/// Every mutation lands in the memtable. When the memtable's accounted size
/// exceeds the flush threshold, it is persisted to a new SSTable before the
/// write returns.
use anyhow::{Context, Result};
use memtable::Memtable;
use sstable::{SSTable, SSTableWriter};

use crate::{catalog, Engine, LoadedTable, MAX_KEY_SIZE, MAX_VALUE_SIZE};

fn check_key(key: &[u8]) -> Result<()> {
    anyhow::ensure!(
        key.len() <= MAX_KEY_SIZE,
        "key too large: {} bytes (max {})",
        key.len(),
        MAX_KEY_SIZE
    );
    Ok(())
}

impl Engine {
    /// Inserts or replaces `key`.
    ///
    /// May flush the memtable to a new SSTable before returning.
    pub fn upsert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        check_key(&key)?;
        anyhow::ensure!(
            value.len() <= MAX_VALUE_SIZE,
            "value too large: {} bytes (max {})",
            value.len(),
            MAX_VALUE_SIZE
        );

        self.mem.upsert(key, value);
        self.maybe_flush()
    }

    /// Deletes `key` by writing a tombstone.
    ///
    /// The tombstone shadows every older value of the key, wherever it is
    /// stored, until compaction drops both.
    pub fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        check_key(&key)?;

        self.mem.delete(key);
        self.maybe_flush()
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.mem.size() > self.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Persists the memtable as a new SSTable and starts an empty one.
    ///
    /// This is a no-op if the memtable is empty.
    ///
    /// # Steps
    ///
    /// 1. Write the memtable, tombstones included, to `<version>.sst`
    ///    (temp file + fsync + rename).
    /// 2. Open the new file and register it as the newest table.
    /// 3. Replace the memtable with an empty one at `version + 1`.
    ///
    /// # Errors
    ///
    /// On failure the memtable and the table list are left exactly as they
    /// were; a file that was renamed into place but cannot be opened is
    /// removed again.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.mem.is_empty() {
            return Ok(());
        }

        let version = self.mem.version();
        let path = catalog::table_path(&self.data_dir, version);

        let rows = SSTableWriter::write_from_memtable(&path, &self.mem)
            .with_context(|| format!("flushing memtable to {}", path.display()))?;

        let table = match SSTable::open(&path, self.backend) {
            Ok(table) => table,
            Err(e) => {
                let _ = std::fs::remove_file(&path);
                return Err(e).with_context(|| format!("reopening flushed table {}", path.display()));
            }
        };

        self.tables.insert(0, LoadedTable { version, table });
        self.version = version;
        self.mem = Memtable::new(version + 1);

        log::info!("flushed {} rows to {}", rows, path.display());
        Ok(())
    }
}
