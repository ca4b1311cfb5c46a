/// Table catalog: naming, enumeration and cleanup of the files in the data
/// directory.
///
/// A table file is named after the version of the memtable it was written
/// from, zero-padded so lexical and numeric order agree:
///
/// ```text
/// 00000000000000000007.sst       table written from memtable version 7
/// 00000000000000000007.sst.tmp   in-progress write, never part of the table set
/// ```
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const TABLE_EXTENSION: &str = "sst";
pub const TMP_SUFFIX: &str = ".sst.tmp";

/// Final path of the table for `version`.
pub fn table_path(dir: &Path, version: u64) -> PathBuf {
    dir.join(format!("{:020}.{}", version, TABLE_EXTENSION))
}

/// Version encoded in a table file name, `None` for anything that is not a
/// table file.
pub fn parse_version(path: &Path) -> Option<u64> {
    if path.extension()? != TABLE_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Lists every table file in `dir` as `(version, path)`, newest first.
pub fn list_tables(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut tables = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match parse_version(&path) {
            Some(version) => tables.push((version, path)),
            None if path.extension().is_some_and(|e| e == TABLE_EXTENSION) => {
                log::warn!("ignoring table file with unrecognised name {}", path.display());
            }
            None => {}
        }
    }
    tables.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(tables)
}

/// Removes leftover temp files from interrupted flushes or compactions.
/// Returns how many were removed.
pub fn remove_tmp_files(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_tmp = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(TMP_SUFFIX));
        if is_tmp {
            std::fs::remove_file(&path)
                .with_context(|| format!("removing temp file {}", path.display()))?;
            log::warn!("removed incomplete table {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}
