//! Part size and index policy.

use serde::{Deserialize, Serialize};

/// Default minimum size for every part but the last (5 MiB).
pub const DEFAULT_MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Default maximum size for any part (5 GiB).
pub const DEFAULT_MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Default index of the first part.
pub const DEFAULT_FIRST_INDEX: u32 = 1;

/// Structural constraints a segment enforces on its parts.
///
/// The defaults match the limits most object stores publish for multipart
/// uploads, but they are only defaults: adapters pass the limits of their
/// own backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartPolicy {
    /// Minimum size of every part except the one with the highest index.
    pub min_size: u64,

    /// Maximum size of any part.
    pub max_size: u64,

    /// Index the first part of an object must carry.
    pub first_index: u32,

    /// Maximum number of parts per upload (`None` = unlimited).
    pub max_parts: Option<u32>,
}

impl Default for PartPolicy {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_PART_SIZE,
            max_size: DEFAULT_MAX_PART_SIZE,
            first_index: DEFAULT_FIRST_INDEX,
            max_parts: None,
        }
    }
}

impl PartPolicy {
    /// Creates a policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum part size.
    #[must_use]
    pub const fn min_size(mut self, size: u64) -> Self {
        self.min_size = size;
        self
    }

    /// Sets the maximum part size.
    #[must_use]
    pub const fn max_size(mut self, size: u64) -> Self {
        self.max_size = size;
        self
    }

    /// Sets the index of the first part.
    #[must_use]
    pub const fn first_index(mut self, index: u32) -> Self {
        self.first_index = index;
        self
    }

    /// Limits the number of parts per upload.
    #[must_use]
    pub const fn max_parts(mut self, count: u32) -> Self {
        self.max_parts = Some(count);
        self
    }

    /// Returns true if `index` may appear in an upload under this policy.
    #[must_use]
    pub fn accepts_index(&self, index: u32) -> bool {
        if index < self.first_index {
            return false;
        }
        self.max_parts
            .map_or(true, |count| u64::from(index - self.first_index) < u64::from(count))
    }

    /// Returns the largest index allowed, if the part count is limited.
    #[must_use]
    pub fn last_index(&self) -> Option<u32> {
        let count = self.max_parts?;
        let last = u64::from(self.first_index) + u64::from(count.checked_sub(1)?);
        Some(u32::try_from(last).unwrap_or(u32::MAX))
    }
}
