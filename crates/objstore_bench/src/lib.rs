//! Benchmark utilities.

use objstore_segment::{Part, PartPolicy};
use rand::seq::SliceRandom;
use rand::Rng;

/// Policy with small parts so part counts, not byte counts, dominate.
pub const BENCH_POLICY: PartPolicy = PartPolicy {
    min_size: 64,
    max_size: 64 * 1024,
    first_index: 1,
    max_parts: None,
};

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate the parts of one object in index order.
pub fn ordered_parts(count: u32) -> Vec<Part> {
    (0..count)
        .map(|n| Part::new(BENCH_POLICY.first_index + n, BENCH_POLICY.min_size))
        .collect()
}

/// Generate the parts of one object in random arrival order.
pub fn shuffled_parts(count: u32) -> Vec<Part> {
    let mut parts = ordered_parts(count);
    parts.shuffle(&mut rand::thread_rng());
    parts
}
