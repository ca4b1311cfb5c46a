//! # Config - StrataKV runtime configuration
//!
//! All settings can be supplied programmatically through the `with_*`
//! builders or loaded from the environment with [`Config::from_env`]:
//!
//! ```text
//! STRATA_DATA_DIR    table directory                      (default: "data")
//! STRATA_FLUSH_KB    flush threshold in KiB               (overrides the budget)
//! STRATA_MEMORY_MB   memory budget, threshold = 5% of it  (default: 256)
//! STRATA_BACKEND     "mmap" or "pread"                    (default: "mmap")
//! ```

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Percentage of the memory budget the memtable may occupy before a flush.
pub const LOAD_FACTOR_PERCENT: u64 = 5;

/// Memory budget assumed when none is configured (256 MiB).
pub const DEFAULT_MEMORY_BUDGET: u64 = 256 * 1024 * 1024;

/// How immutable tables read their file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Map the whole file into memory once and parse rows in place.
    #[default]
    Mmap,
    /// Keep a file handle and read each row with a seek + read.
    Pread,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mmap" => Ok(Backend::Mmap),
            "pread" | "file" => Ok(Backend::Pread),
            other => bail!("unknown table backend '{}' (expected mmap or pread)", other),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Mmap => f.write_str("mmap"),
            Backend::Pread => f.write_str("pread"),
        }
    }
}

/// Derives a flush threshold from a memory budget.
pub fn threshold_for_budget(budget_bytes: u64) -> u64 {
    (budget_bytes as u128 * LOAD_FACTOR_PERCENT as u128 / 100) as u64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the table files.
    pub data_dir: PathBuf,
    /// Memtable byte footprint above which a flush happens.
    pub flush_threshold: u64,
    pub backend: Backend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            flush_threshold: threshold_for_budget(DEFAULT_MEMORY_BUDGET),
            backend: Backend::default(),
        }
    }
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_flush_threshold(mut self, bytes: u64) -> Self {
        self.flush_threshold = bytes;
        self
    }

    /// Sets the flush threshold to [`LOAD_FACTOR_PERCENT`] of `budget_bytes`.
    pub fn with_memory_budget(mut self, budget_bytes: u64) -> Self {
        self.flush_threshold = threshold_for_budget(budget_bytes);
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Loads the configuration from `STRATA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Config::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(dir) = lookup("STRATA_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(mb) = lookup("STRATA_MEMORY_MB") {
            let mb: u64 = mb
                .trim()
                .parse()
                .with_context(|| format!("STRATA_MEMORY_MB must be an integer, got '{}'", mb))?;
            let bytes = mb
                .checked_mul(1024 * 1024)
                .with_context(|| format!("STRATA_MEMORY_MB is too large: {}", mb))?;
            config = config.with_memory_budget(bytes);
        }

        // An explicit threshold wins over the budget-derived one.
        if let Some(kb) = lookup("STRATA_FLUSH_KB") {
            let kb: u64 = kb
                .trim()
                .parse()
                .with_context(|| format!("STRATA_FLUSH_KB must be an integer, got '{}'", kb))?;
            config.flush_threshold = kb
                .checked_mul(1024)
                .with_context(|| format!("STRATA_FLUSH_KB is too large: {}", kb))?;
        }

        if let Some(backend) = lookup("STRATA_BACKEND") {
            config.backend = backend.parse()?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.backend, Backend::Mmap);
        assert_eq!(config.flush_threshold, threshold_for_budget(DEFAULT_MEMORY_BUDGET));
    }

    #[test]
    fn memory_budget_derives_threshold() {
        let config = Config::from_lookup(lookup(&[("STRATA_MEMORY_MB", "100")])).unwrap();
        assert_eq!(config.flush_threshold, (100 * 1024 * 1024) / 20);
    }

    #[test]
    fn explicit_flush_kb_wins_over_budget() {
        let config = Config::from_lookup(lookup(&[
            ("STRATA_MEMORY_MB", "100"),
            ("STRATA_FLUSH_KB", "4"),
        ]))
        .unwrap();
        assert_eq!(config.flush_threshold, 4096);
    }

    #[test]
    fn backend_and_dir_from_env() {
        let config = Config::from_lookup(lookup(&[
            ("STRATA_DATA_DIR", "/tmp/strata"),
            ("STRATA_BACKEND", "PREAD"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/strata"));
        assert_eq!(config.backend, Backend::Pread);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("STRATA_FLUSH_KB", "lots")])).is_err());
        assert!(Config::from_lookup(lookup(&[("STRATA_MEMORY_MB", "-1")])).is_err());
        assert!(Config::from_lookup(lookup(&[("STRATA_BACKEND", "tape")])).is_err());
    }

    #[test]
    fn oversized_values_are_rejected() {
        let huge = u64::MAX.to_string();
        let err = Config::from_lookup(lookup(&[("STRATA_FLUSH_KB", huge.as_str())])).unwrap_err();
        assert!(err.to_string().contains("too large"));
        let err = Config::from_lookup(lookup(&[("STRATA_MEMORY_MB", huge.as_str())])).unwrap_err();
        assert!(err.to_string().contains("too large"));

        let kb = (u64::MAX / 1024).to_string();
        let config = Config::from_lookup(lookup(&[("STRATA_FLUSH_KB", kb.as_str())])).unwrap();
        assert_eq!(config.flush_threshold, (u64::MAX / 1024) * 1024);
    }

    #[test]
    fn backend_display_round_trips() {
        for backend in [Backend::Mmap, Backend::Pread] {
            assert_eq!(backend.to_string().parse::<Backend>().unwrap(), backend);
        }
    }

    #[test]
    fn builders_override_fields() {
        let config = Config::new("x")
            .with_memory_budget(1000)
            .with_backend(Backend::Pread);
        assert_eq!(config.flush_threshold, 50);
        assert_eq!(config.backend, Backend::Pread);

        let config = config.with_flush_threshold(7);
        assert_eq!(config.flush_threshold, 7);
    }
}
