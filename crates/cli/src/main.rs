//! # CLI - StrataKV Interactive Shell
//!
//! A REPL-style command-line interface for the StrataKV storage engine.
//! Reads commands from stdin, executes them against the store, and prints
//! results to stdout. Works both interactively and scripted (pipe commands
//! via stdin). Log output goes to stderr and is controlled by `RUST_LOG`.
//!
//! ## Commands
//!
//! ```text
//! SET key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value or "(nil)")
//! DEL key            Delete a key (writes a tombstone)
//! SCAN [start] [end] Range scan (inclusive start, exclusive end)
//! FLUSH              Force flush memtable to SSTable
//! COMPACT            Merge every table and the memtable into one SSTable
//! STATS              Print memtable and table statistics
//! EXIT / QUIT        Flush and shut down
//! ```
//!
//! ## Configuration
//!
//! ```text
//! STRATA_DATA_DIR    table directory                      (default: "data")
//! STRATA_FLUSH_KB    flush threshold in KiB               (overrides the budget)
//! STRATA_MEMORY_MB   memory budget, threshold = 5% of it  (default: 256)
//! STRATA_BACKEND     "mmap" or "pread"                    (default: "mmap")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! StrataKV started (dir=data, flush=13421772B, backend=mmap, tables=0)
//! > SET name Alice
//! OK
//! > GET name
//! Alice
//! > SCAN
//! name -> Alice
//! (1 entries)
//! > EXIT
//! bye
//! ```

use anyhow::Result;
use config::Config;
use engine::Store;
use std::io::{self, BufRead, Write};

/// Executes one command line, writing its response to `out`.
///
/// Returns `false` when the command asks the shell to exit. Engine errors are
/// reported as `ERR ...` lines and do not end the session.
fn execute<W: Write>(store: &Store, line: &str, out: &mut W) -> io::Result<bool> {
    let mut parts = line.split_whitespace();
    let cmd = match parts.next() {
        Some(cmd) => cmd,
        None => return Ok(true),
    };

    match cmd.to_uppercase().as_str() {
        "SET" => match parts.next() {
            Some(k) => {
                let v = parts.collect::<Vec<&str>>().join(" ");
                if v.is_empty() {
                    writeln!(out, "ERR usage: SET key value")?;
                } else {
                    match store.put(k, v) {
                        Ok(()) => writeln!(out, "OK")?,
                        Err(e) => writeln!(out, "ERR set failed: {:#}", e)?,
                    }
                }
            }
            None => writeln!(out, "ERR usage: SET key value")?,
        },
        "GET" => match parts.next() {
            Some(k) => match store.get(k.as_bytes()) {
                Ok(Some(v)) => writeln!(out, "{}", String::from_utf8_lossy(&v))?,
                Ok(None) => writeln!(out, "(nil)")?,
                Err(e) => writeln!(out, "ERR read failed: {:#}", e)?,
            },
            None => writeln!(out, "ERR usage: GET key")?,
        },
        "DEL" => match parts.next() {
            Some(k) => match store.delete(k) {
                Ok(()) => writeln!(out, "OK")?,
                Err(e) => writeln!(out, "ERR del failed: {:#}", e)?,
            },
            None => writeln!(out, "ERR usage: DEL key")?,
        },
        "SCAN" => {
            let start = parts.next().unwrap_or("").as_bytes();
            let end = parts.next().unwrap_or("").as_bytes();
            match store.scan_range(start, end) {
                Ok(results) if results.is_empty() => writeln!(out, "(empty)")?,
                Ok(results) => {
                    for (k, v) in &results {
                        writeln!(
                            out,
                            "{} -> {}",
                            String::from_utf8_lossy(k),
                            String::from_utf8_lossy(v)
                        )?;
                    }
                    writeln!(out, "({} entries)", results.len())?;
                }
                Err(e) => writeln!(out, "ERR scan failed: {:#}", e)?,
            }
        }
        "FLUSH" => match store.flush().and_then(|()| store.stats()) {
            Ok(stats) => writeln!(out, "OK (tables={})", stats.tables.len())?,
            Err(e) => writeln!(out, "ERR flush failed: {:#}", e)?,
        },
        "COMPACT" => match store.compact().and_then(|()| store.stats()) {
            Ok(stats) => writeln!(out, "OK (tables={})", stats.tables.len())?,
            Err(e) => writeln!(out, "ERR compact failed: {:#}", e)?,
        },
        "STATS" => match store.stats() {
            Ok(stats) => writeln!(out, "{}", stats)?,
            Err(e) => writeln!(out, "ERR stats failed: {:#}", e)?,
        },
        "EXIT" | "QUIT" => {
            writeln!(out, "bye")?;
            return Ok(false);
        }
        other => writeln!(out, "unknown command: {}", other)?,
    }
    Ok(true)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::from_env()?;
    log::debug!("configuration: {:?}", config);
    let store = Store::open(&config)?;
    let stats = store.stats()?;

    println!(
        "StrataKV started (dir={}, flush={}B, backend={}, tables={})",
        config.data_dir.display(),
        config.flush_threshold,
        config.backend,
        stats.tables.len()
    );
    println!("Commands: SET key value | GET key | DEL key | SCAN [start] [end]");
    println!("          COMPACT | FLUSH | STATS | EXIT");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("> ");
    stdout.flush().ok();

    for line in stdin.lock().lines() {
        let line = line?;
        if !execute(&store, &line, &mut stdout)? {
            break;
        }
        print!("> ");
        stdout.flush().ok();
    }

    store.close()?;
    log::info!("shell exited");
    Ok(())
}
