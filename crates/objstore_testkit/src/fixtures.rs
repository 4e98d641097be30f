//! Test fixtures and storager helpers.
//!
//! Provides convenience functions for setting up test storagers
//! and common multipart scenarios.

use objstore_segment::PartPolicy;
use objstore_services::{FsStorage, MemoryStorage, StorageConfig, Storager};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Part policy used by fixtures: small enough that tests stay fast.
pub const TEST_POLICY: PartPolicy = PartPolicy {
    min_size: 16,
    max_size: 256,
    first_index: 1,
    max_parts: None,
};

/// A test storager with automatic cleanup.
pub struct TestStore {
    /// The storager instance.
    pub store: Arc<dyn Storager>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test storager.
    pub fn memory() -> Self {
        Self::memory_with_policy(TEST_POLICY)
    }

    /// Creates an in-memory test storager with a custom part policy.
    pub fn memory_with_policy(policy: PartPolicy) -> Self {
        let config = StorageConfig::new().name("testkit").part_policy(policy);
        let store = MemoryStorage::new(&config).expect("Failed to create memory storager");
        Self {
            store: Arc::new(store),
            _temp_dir: None,
        }
    }

    /// Creates a new directory-backed test storager.
    pub fn fs() -> Self {
        Self::fs_with_policy(TEST_POLICY)
    }

    /// Creates a directory-backed test storager with a custom part policy.
    pub fn fs_with_policy(policy: PartPolicy) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = StorageConfig::new()
            .work_dir(temp_dir.path().to_string_lossy())
            .part_policy(policy);
        let store = FsStorage::new(&config).expect("Failed to create fs storager");
        Self {
            store: Arc::new(store),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the backing directory if directory-backed, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns a shared handle to the storager.
    pub fn handle(&self) -> Arc<dyn Storager> {
        Arc::clone(&self.store)
    }
}

impl std::ops::Deref for TestStore {
    type Target = dyn Storager;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

/// Runs a test with a temporary in-memory storager.
///
/// # Example
///
/// ```rust,ignore
/// use objstore_testkit::with_memory_store;
///
/// #[test]
/// fn my_test() {
///     with_memory_store(|store| {
///         store.write("k", b"v").unwrap();
///     });
/// }
/// ```
pub fn with_memory_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::memory();
    f(&store)
}

/// Runs a test with a temporary directory-backed storager.
pub fn with_fs_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::fs();
    f(&store)
}

/// Runs a test once against every built-in adapter.
pub fn with_each_store<F>(mut f: F)
where
    F: FnMut(&TestStore),
{
    for store in [TestStore::memory(), TestStore::fs()] {
        f(&store);
    }
}

/// Deterministic payload of `len` bytes; byte `n` is `seed + n` wrapped.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|n| seed.wrapping_add(n as u8)).collect()
}

/// Common multipart scenarios.
pub mod scenarios {
    use super::{payload, TEST_POLICY};
    use objstore_segment::{Part, PartPolicy, Segment};

    /// Parts of an object of `parts` full-sized parts plus a short tail,
    /// in index order.
    pub fn object_parts(policy: &PartPolicy, parts: u32, tail: u64) -> Vec<Part> {
        (0..parts)
            .map(|n| Part::new(policy.first_index + n, policy.min_size))
            .chain(std::iter::once(Part::new(policy.first_index + parts, tail)))
            .collect()
    }

    /// An initiated segment under [`TEST_POLICY`] holding parts 1..=`parts`
    /// at the minimum size.
    pub fn partially_filled_segment(path: &str, parts: u32) -> Segment {
        let segment = Segment::new(path, TEST_POLICY);
        segment
            .initiate(format!("{path}-upload"))
            .expect("Failed to initiate segment");
        for index in 1..=parts {
            segment
                .insert_part(Part::new(index, TEST_POLICY.min_size))
                .expect("Failed to insert part");
        }
        segment
    }

    /// Payloads for an object of `parts` full-sized parts and a short
    /// tail, keyed by part index.
    pub fn part_payloads(parts: u32, tail: usize) -> Vec<(u32, Vec<u8>)> {
        let min = TEST_POLICY.min_size as usize;
        (1..=parts)
            .map(|index| (index, payload(min, index as u8)))
            .chain(std::iter::once((parts + 1, payload(tail, 0xA0))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objstore_services::MultipartUpload;

    #[test]
    fn memory_store_has_no_path() {
        let store = TestStore::memory();
        assert!(store.path().is_none());
        assert_eq!(store.metadata().service, "memory");
    }

    #[test]
    fn fs_store_lives_in_temp_dir() {
        let store = TestStore::fs();
        let dir = store.path().unwrap().to_path_buf();
        assert!(dir.exists());

        store.write("file", b"data").unwrap();
        assert!(dir.join("file").exists());
    }

    #[test]
    fn every_store_roundtrips() {
        let mut seen = Vec::new();
        with_each_store(|store| {
            store.write("k", b"v").unwrap();
            assert_eq!(&store.read("k").unwrap()[..], b"v");
            seen.push(store.metadata().service);
        });
        assert_eq!(seen, vec!["memory", "fs"]);
    }

    #[test]
    fn scenario_payloads_complete_an_upload() {
        with_each_store(|store| {
            let upload = MultipartUpload::start(store.handle(), "scenario").unwrap();
            for (index, data) in scenarios::part_payloads(3, 5).into_iter().rev() {
                upload.write_part(index, &data).unwrap();
            }
            let object = upload.complete().unwrap();
            assert_eq!(object.content_length, Some(3 * 16 + 5));
        });
    }

    #[test]
    fn partially_filled_segment_is_contiguous() {
        let segment = scenarios::partially_filled_segment("partial", 2);
        assert_eq!(segment.len(), 2);
        assert!(segment.fulfilled().unwrap());
        assert!(segment.missing_indices(usize::MAX).is_empty());

        let parts = scenarios::object_parts(&TEST_POLICY, 2, 3);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], objstore_segment::Part::new(3, 3));
    }
}
