use crate::Engine;
use anyhow::Result;
use config::{Backend, Config};
use std::fs;
use std::path::Path;

pub const BIG: u64 = 1024 * 1024;

pub fn open(dir: &Path, flush_threshold: u64) -> Result<Engine> {
    open_with(dir, flush_threshold, Backend::Mmap)
}

pub fn open_with(dir: &Path, flush_threshold: u64, backend: Backend) -> Result<Engine> {
    Engine::open(
        &Config::new(dir)
            .with_flush_threshold(flush_threshold)
            .with_backend(backend),
    )
}

pub fn count_sst_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "sst")
                .unwrap_or(false)
        })
        .count()
}

pub fn kv(k: &str, v: &str) -> (Vec<u8>, Vec<u8>) {
    (k.as_bytes().to_vec(), v.as_bytes().to_vec())
}

/// Every live pair, through the lazy range read.
pub fn all(engine: &Engine) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    engine.get_range(b"")?.collect()
}
