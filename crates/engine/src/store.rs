//! Thread-safe facade over [`Engine`].
//!
//! Reads share a read lock and materialize their results before releasing
//! it. Writes, flushes and compaction take the write lock, so compaction
//! never deletes a file that a concurrent read is scanning.

use anyhow::{anyhow, Result};
use config::Config;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{Engine, EngineStats};

/// A cloneable handle to one engine. All clones share the same engine.
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<Engine>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_read() {
            Ok(engine) => f.debug_tuple("Store").field(&*engine).finish(),
            Err(_) => f.write_str("Store(<locked>)"),
        }
    }
}

impl Store {
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::from_engine(Engine::open(config)?))
    }

    pub fn from_engine(engine: Engine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Engine>> {
        self.inner.read().map_err(|_| anyhow!("store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Engine>> {
        self.inner.write().map_err(|_| anyhow!("store lock poisoned"))
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.read()?.get(key)
    }

    pub fn put(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Result<()> {
        self.write()?.upsert(key.into(), value.into())
    }

    pub fn delete(&self, key: impl Into<Vec<u8>>) -> Result<()> {
        self.write()?.delete(key.into())
    }

    /// Every live pair with key `>= from`, ascending.
    pub fn scan(&self, from: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let pairs = self.read()?.get_range(from)?.collect::<Result<Vec<_>>>()?;
        Ok(pairs)
    }

    /// Live pairs with `start <= key < end`; an empty `end` is unbounded.
    pub fn scan_range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.read()?.scan(start, end)
    }

    pub fn flush(&self) -> Result<()> {
        self.write()?.flush()
    }

    pub fn compact(&self) -> Result<()> {
        self.write()?.compact()
    }

    /// Flushes and closes the shared engine; every clone sees it closed.
    pub fn close(&self) -> Result<()> {
        self.write()?.close()
    }

    pub fn stats(&self) -> Result<EngineStats> {
        Ok(self.read()?.stats())
    }
}
