
use memtable::Memtable;

/// A memtable of `n` live records with zero-padded keys, plus optional
/// tombstones for every key in `dead`.
pub fn sample_memtable(n: usize, dead: &[usize]) -> Memtable {
    let mut mem = Memtable::new();
    for i in 0..n {
        mem.insert(
            format!("key{:05}", i).into_bytes(),
            format!("value-{}", i).into_bytes(),
        );
    }
    for &i in dead {
        mem.delete(format!("key{:05}", i).as_bytes());
    }
    mem
}
