//! # Config
//!
//! On-disk format constants and engine defaults shared by every UndertowKV
//! crate. This is a leaf crate: it holds nothing but numbers and the version
//! tag, so the format is defined in exactly one place.
//!
//! ## Field sizes
//!
//! Every on-disk structure (WAL entries, segment headers, index items,
//! records, the root file) is built from the same handful of fixed-width
//! fields, all little-endian:
//!
//! | Field              | Size | Type |
//! |--------------------|------|------|
//! | version tag        | 8    | raw bytes |
//! | record total size  | 4    | i32  |
//! | key size           | 1    | u8   |
//! | record flags       | 1    | u8   |
//! | WAL command        | 1    | u8   |
//! | path count         | 8    | i64  |
//! | path length        | 1    | u8   |

/// The 8-byte version tag that opens every database file (root file, WAL,
/// segment). Readers reject files whose first 8 bytes differ.
pub const FORMAT_VERSION: [u8; 8] = *b"0.1.0\0\0\0";

/// Size of the version tag in bytes.
pub const VER_SZ: usize = 8;

/// Size of a record's `total_size` field (i32).
pub const RECORD_LEN_SZ: usize = 4;

/// Size of a record's `key_size` field (u8).
pub const KEY_LEN_SZ: usize = 1;

/// Size of a record's `flags` field (u8).
pub const FLAGS_SZ: usize = 1;

/// Size of a WAL entry's command field (u8).
pub const WAL_CMD_SZ: usize = 1;

/// Maximum key length in bytes. Keys are length-prefixed with a single
/// byte, so this is a hard format limit, not a tunable.
pub const KEY_MAX_LEN: usize = 255;

/// Number of live records grouped under one sparse-index item.
pub const INDEX_INTERVAL: usize = 100;

/// Default memtable flush threshold in bytes. When the estimated serialized
/// footprint of the memtable exceeds this, the table flushes it to a new
/// segment. Embedders and tests can override it per database.
pub const MAX_SEG_SIZE: usize = 1_000_000;

/// Size of the segment-path-count field (i64) in the root file and in
/// master-table values.
pub const SEG_NUM_SZ: usize = 8;

/// Size of a segment-path length prefix (u8).
pub const SEG_PATH_LEN_SZ: usize = 1;

/// Length of a generated segment file name: random letters, no extension.
pub const SEGMENT_NAME_LEN: usize = 21;

/// Name of the privileged master table. Its WAL is `master.wal` and its
/// segment list is persisted in the root file rather than in another table.
pub const MASTER_TABLE_NAME: &str = "master";

/// Record flags bit marking a tombstone.
pub const FLAGS_TOMBSTONE: u8 = 0x01;

/// Byte offset of the first sparse-index item in a segment file:
/// version tag + num_records (i64) + data_start_offset (i64) + index_len (i32).
pub const INDEX_ITEMS_OFFSET: usize = VER_SZ + 8 + 8 + 4;

/// Serialized overhead of one record beyond its key and value bytes.
pub const RECORD_OVERHEAD: usize = RECORD_LEN_SZ + KEY_LEN_SZ + FLAGS_SZ;
