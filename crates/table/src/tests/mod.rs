
use crate::Table;
use std::path::Path;

/// A comfortable threshold for tests: big enough that nothing flushes
/// unless the test asks for it.
pub const TEST_SEG_SIZE: usize = 1 << 20;

pub fn open_table(dir: &Path, name: &str) -> Table {
    Table::open(name, dir, &[], TEST_SEG_SIZE).unwrap()
}

pub fn reopen_table(dir: &Path, name: &str, paths: &[String]) -> Table {
    Table::open(name, dir, paths, TEST_SEG_SIZE).unwrap()
}
