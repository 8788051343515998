mod flush_tests;
mod master_tests;

use config::SEGMENT_NAME_LEN;
use std::fs;
use std::path::Path;

/// Counts segment files in `dir`: random 21-letter names, no extension.
pub fn count_segment_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|name| {
                    name.len() == SEGMENT_NAME_LEN
                        && name.bytes().all(|b| b.is_ascii_alphabetic())
                })
                .unwrap_or(false)
        })
        .count()
}
