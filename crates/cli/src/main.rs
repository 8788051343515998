//! # CLI - UndertowKV interactive shell
//!
//! A REPL-style command-line interface for the UndertowKV storage engine.
//! Reads commands from stdin, executes them against the database, and
//! prints results to stdout. Works interactively or scripted (pipe commands
//! via stdin).
//!
//! ## Commands
//!
//! ```text
//! USE table          Select (or create) a user table
//! PUT key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value or "(nil)")
//! DEL key            Delete a key (writes a tombstone)
//! STATS              Print database debug info
//! EXIT / QUIT        Flush, compact, and shut down cleanly
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! UNDERTOW_DB_PATH   root file path               (default: "undertow.kv")
//! UNDERTOW_SEG_KB    flush threshold in KB        (default: 1000 = 1 MB)
//! RUST_LOG           tracing filter, e.g. "table=debug,engine=debug"
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! UndertowKV started (db=undertow.kv, seg=1000KB)
//! > USE users
//! OK
//! > PUT name Alice
//! OK
//! > GET name
//! Alice
//! > EXIT
//! bye
//! ```

use anyhow::Result;
use engine::Db;
use std::io::{self, BufRead, Write};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let db_path = env_or("UNDERTOW_DB_PATH", "undertow.kv");
    let seg_kb: usize = env_or("UNDERTOW_SEG_KB", "1000").parse().unwrap_or(1000);

    let mut db = Db::open_with_max_segment_size(&db_path, seg_kb * 1000)?;

    println!("UndertowKV started (db={}, seg={}KB)", db_path, seg_kb);
    println!("Commands: USE table | PUT key value | GET key | DEL key | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "USE" => {
                    if let Some(name) = parts.next() {
                        match db.use_table(name) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR use failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: USE table");
                    }
                }
                "PUT" => {
                    if let Some(k) = parts.next() {
                        let v: String = parts.collect::<Vec<&str>>().join(" ");
                        if v.is_empty() {
                            println!("ERR usage: PUT key value");
                        } else {
                            match db.put(k.as_bytes(), v.as_bytes()) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR put failed: {}", e),
                            }
                        }
                    } else {
                        println!("ERR usage: PUT key value");
                    }
                }
                "GET" => {
                    if let Some(k) = parts.next() {
                        match db.get(k.as_bytes()) {
                            Ok(Some(v)) => println!("{}", String::from_utf8_lossy(&v)),
                            Ok(None) => println!("(nil)"),
                            Err(e) => println!("ERR read failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: GET key");
                    }
                }
                "DEL" => {
                    if let Some(k) = parts.next() {
                        match db.delete(k.as_bytes()) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR delete failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: DEL key");
                    }
                }
                "STATS" => {
                    println!("{:?}", db);
                }
                "EXIT" | "QUIT" => {
                    db.close()?;
                    println!("bye");
                    return Ok(());
                }
                other => {
                    println!("ERR unknown command: {}", other);
                }
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }

    // stdin closed (scripted use): shut down cleanly
    db.close()?;
    println!("bye");
    Ok(())
}
