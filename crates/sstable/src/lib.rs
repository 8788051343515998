//! # SSTable - Sorted String Table segments
//!
//! Immutable, on-disk storage files for the UndertowKV storage engine.
//!
//! When the in-memory [`memtable::Memtable`] exceeds its size threshold the
//! table flushes it to disk as a segment. Segments are *write-once,
//! read-many* — once created they are never modified, only deleted after a
//! compaction merge.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ HEADER (28 bytes)                                             │
//! │                                                               │
//! │ version tag (8) | num_records (i64) | data_start (i64)        │
//! │ index_len (i32)                                               │
//! ├───────────────────────────────────────────────────────────────┤
//! │ SPARSE INDEX (index_len items)                                │
//! │                                                               │
//! │ start_key_size (u8) | start_key | end_key_size (u8) | end_key │
//! │ start_offset (i64) | end_offset (i64)                         │
//! │                                                               │
//! │ Each item covers one contiguous block of records whose keys   │
//! │ lie in [start_key, end_key]; end_offset is exclusive.         │
//! ├───────────────────────────────────────────────────────────────┤
//! │ RECORD AREA (starts at data_start, sorted ascending by key)   │
//! │                                                               │
//! │ total_size (i32) | key_size (u8) | key | flags (u8) | value   │
//! │                                                               │
//! │ flags bit 0 marks a tombstone (empty value). Tombstones are   │
//! │ written out so they shadow older segments after a flush.      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Offsets stored in index items are
//! absolute file offsets.
//!
//! ## Lookup path
//!
//! A point lookup walks the in-memory sparse index for the one block whose
//! key range contains the key, reads exactly that byte range from disk, and
//! scans it linearly. One seek + one read per segment consulted.

mod format;
mod index;
mod segment;
mod writer;

pub use format::SegmentHeader;
pub use index::{IndexItem, SparseIndex};
pub use segment::{Segment, SegmentRecord};
pub use writer::write_segment;

#[cfg(test)]
mod tests;
