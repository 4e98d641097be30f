//! Stress drivers for segments and multipart uploads.
//!
//! These drivers verify behavior under heavy load and concurrent access.

use objstore_segment::{Part, PartPolicy, Segment};
use objstore_services::{MultipartUpload, ServiceResult, Storager};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of parts per object.
    pub parts: u32,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Size of every part but the tail, in bytes.
    pub part_size: u64,
    /// Seed for the arrival order of parts.
    pub seed: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            parts: 1_000,
            threads: 4,
            part_size: 16,
            seed: 0x5EED,
        }
    }
}

impl StressConfig {
    /// Policy whose minimum part size is exactly `part_size`.
    pub fn policy(&self) -> PartPolicy {
        PartPolicy::new()
            .min_size(self.part_size)
            .max_size(self.part_size * 4)
    }

    /// Parts of one object in a shuffled arrival order; the tail is half
    /// a part.
    pub fn shuffled_parts(&self) -> Vec<Part> {
        let policy = self.policy();
        let tail = (self.part_size / 2).max(1);
        let mut parts: Vec<Part> = (0..self.parts)
            .map(|n| {
                let size = if n + 1 == self.parts { tail } else { self.part_size };
                Part::new(policy.first_index + n, size)
            })
            .collect();
        parts.shuffle(&mut StdRng::seed_from_u64(self.seed));
        parts
    }
}

/// Splits `items` round-robin into `threads` batches.
fn batches<T: Clone>(items: &[T], threads: usize) -> Vec<Vec<T>> {
    let threads = threads.max(1);
    let mut out = vec![Vec::new(); threads];
    for (n, item) in items.iter().enumerate() {
        out[n % threads].push(item.clone());
    }
    out
}

/// Inserts a shuffled object into `segment` from many threads.
///
/// Each thread inserts its share twice; the second pass must be absorbed
/// as identical reinserts, so every operation counts as successful on a
/// correct segment.
pub fn stress_segment_inserts(segment: Arc<Segment>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let handles: Vec<_> = batches(&config.shuffled_parts(), config.threads)
        .into_iter()
        .map(|batch| {
            let segment = Arc::clone(&segment);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for _ in 0..2 {
                    for part in &batch {
                        match segment.insert_part(part.clone()) {
                            Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                            Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                        };
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Races `config.threads` inserts of the same index with distinct sizes.
///
/// Exactly one insert may succeed.
pub fn stress_conflicting_inserts(segment: Arc<Segment>, config: &StressConfig) -> StressTestResult {
    let threads = config.threads.max(1);
    let barrier = Arc::new(Barrier::new(threads));
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let index = segment.policy().first_index;

    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let segment = Arc::clone(&segment);
            let barrier = Arc::clone(&barrier);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let size = config.part_size + t as u64;

            thread::spawn(move || {
                barrier.wait();
                match segment.insert_part(Part::new(index, size)) {
                    Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                    Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                };
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Uploads a shuffled object to `store` from many threads and completes it.
///
/// Part `n` is filled with byte `n % 251` so the assembled object can be
/// checked with [`verify_upload`].
///
/// # Errors
///
/// Returns the error of starting or completing the upload; failures of
/// single parts are counted in the result instead.
pub fn stress_concurrent_upload(
    store: Arc<dyn Storager>,
    path: &str,
    config: &StressConfig,
) -> ServiceResult<StressTestResult> {
    let upload = Arc::new(MultipartUpload::start(store, path)?);
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let handles: Vec<_> = batches(&config.shuffled_parts(), config.threads)
        .into_iter()
        .map(|batch| {
            let upload = Arc::clone(&upload);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for part in batch {
                    let data = vec![fill_byte(part.index); part.size as usize];
                    match upload.write_part(part.index, &data) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    upload.complete()?;

    Ok(StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    ))
}

fn fill_byte(index: u32) -> u8 {
    (index % 251) as u8
}

/// Checks that the object at `path` holds what [`stress_concurrent_upload`]
/// wrote for `config`.
pub fn verify_upload(store: &dyn Storager, path: &str, config: &StressConfig) -> bool {
    let Ok(data) = store.read(path) else {
        return false;
    };

    let mut parts = config.shuffled_parts();
    parts.sort_by_key(|p| p.index);

    let mut offset = 0usize;
    for part in parts {
        let end = offset + part.size as usize;
        let Some(chunk) = data.get(offset..end) else {
            return false;
        };
        if chunk.iter().any(|&b| b != fill_byte(part.index)) {
            return false;
        }
        offset = end;
    }
    offset == data.len()
}
