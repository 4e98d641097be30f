//! Segment state machine and part reconciliation.

use crate::error::{SegmentError, SegmentResult, SizeViolation};
use crate::part::Part;
use crate::policy::PartPolicy;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Lifecycle of a [`Segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// Created, no upload id yet. No parts may be inserted.
    Uninitiated,
    /// Upload id recorded, accepting parts.
    Initiated,
    /// Parts form a complete object. Only identical re-inserts are accepted.
    Fulfilled,
    /// The manifest has been handed out.
    Consumed,
}

#[derive(Debug)]
struct Inner {
    id: Option<String>,
    state: SegmentState,
    parts: BTreeMap<u32, Part>,
}

/// Bookkeeping for one multipart upload.
///
/// Parts are keyed by index. The byte offset of a part is the total size of
/// all parts with a smaller index, so a part's place in the object never
/// depends on when it arrived.
///
/// # Invariants
///
/// - Each index holds at most one part, and its size never changes
/// - Only the part with the highest index may be below the minimum size
/// - No part is empty or above the maximum size
/// - A failed insertion leaves the part set untouched
///
/// # Thread Safety
///
/// All operations take `&self` and run under one internal lock, so a segment
/// can be shared behind an `Arc` by every producer of the upload.
#[derive(Debug)]
pub struct Segment {
    path: String,
    policy: PartPolicy,
    inner: Mutex<Inner>,
}

impl Segment {
    /// Creates an uninitiated segment for the object at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, policy: PartPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            inner: Mutex::new(Inner {
                id: None,
                state: SegmentState::Uninitiated,
                parts: BTreeMap::new(),
            }),
        }
    }

    /// Returns the object path this segment uploads to.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the policy parts are validated against.
    #[must_use]
    pub fn policy(&self) -> &PartPolicy {
        &self.policy
    }

    /// Returns the upload id, once initiated.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.inner.lock().id.clone()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SegmentState {
        self.inner.lock().state
    }

    /// Records the backend-issued upload id.
    ///
    /// Initiating again with the same id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::SegmentInitiated`] if the segment already
    /// carries a different id.
    pub fn initiate(&self, id: impl Into<String>) -> SegmentResult<()> {
        let id = id.into();
        let mut inner = self.inner.lock();

        if let Some(current) = inner.id.as_deref() {
            if current == id {
                return Ok(());
            }
            return Err(SegmentError::SegmentInitiated {
                op: "initiate",
                segment: self.describe(&inner),
                requested: id,
            });
        }

        debug!(path = %self.path, id = %id, "segment initiated");
        inner.id = Some(id);
        inner.state = SegmentState::Initiated;
        Ok(())
    }

    /// Inserts a part.
    ///
    /// Inserting a part identical in index and size to one already present
    /// succeeds without changing anything.
    ///
    /// # Errors
    ///
    /// - [`SegmentError::SegmentNotInitiated`] before [`Segment::initiate`]
    /// - [`SegmentError::PartIndexInvalid`] if the policy excludes the index
    /// - [`SegmentError::PartIntersected`] if the index holds a different size
    /// - [`SegmentError::SegmentFulfilled`] for a new index after fulfillment
    /// - [`SegmentError::PartSizeInvalid`] if the size breaks the policy
    pub fn insert_part(&self, part: Part) -> SegmentResult<()> {
        let mut inner = self.inner.lock();

        if let Err(err) = self.check_insert(&inner, &part) {
            warn!(error = %err, "part rejected");
            return Err(err);
        }

        if inner.parts.contains_key(&part.index) {
            return Ok(());
        }

        debug!(path = %self.path, index = part.index, size = part.size, "part accepted");
        inner.parts.insert(part.index, part);
        Ok(())
    }

    fn check_insert(&self, inner: &Inner, part: &Part) -> SegmentResult<()> {
        const OP: &str = "insert_part";

        if inner.state == SegmentState::Uninitiated {
            return Err(SegmentError::SegmentNotInitiated {
                op: OP,
                segment: self.describe(inner),
            });
        }

        if !self.policy.accepts_index(part.index) {
            return Err(SegmentError::PartIndexInvalid {
                op: OP,
                segment: self.describe(inner),
                part: part.clone(),
            });
        }

        if let Some(existing) = inner.parts.get(&part.index) {
            if existing.size == part.size {
                return Ok(());
            }
            return Err(SegmentError::PartIntersected {
                op: OP,
                segment: self.describe(inner),
                part: part.clone(),
                existing: existing.clone(),
            });
        }

        if matches!(inner.state, SegmentState::Fulfilled | SegmentState::Consumed) {
            return Err(SegmentError::SegmentFulfilled {
                op: OP,
                segment: self.describe(inner),
                part: part.clone(),
            });
        }

        if let Some(violation) = self.size_violation(inner, part) {
            return Err(SegmentError::PartSizeInvalid {
                op: OP,
                segment: self.describe(inner),
                part: part.clone(),
                violation,
            });
        }

        Ok(())
    }

    fn size_violation(&self, inner: &Inner, part: &Part) -> Option<SizeViolation> {
        let min = self.policy.min_size;

        if part.size == 0 {
            return Some(SizeViolation::Zero);
        }
        if part.size > self.policy.max_size {
            return Some(SizeViolation::AboveMaximum {
                max: self.policy.max_size,
            });
        }

        // Only the provisional tail may be undersized.
        let has_successor = inner.parts.range(part.index..).next().is_some();
        if part.size < min && has_successor {
            return Some(SizeViolation::BelowMinimum { min });
        }

        match inner.parts.range(..part.index).next_back() {
            Some((&tail, prev)) if prev.size < min => {
                Some(SizeViolation::TailDisplaced { tail, min })
            }
            _ => None,
        }
    }

    /// Reports whether the parts describe the whole object.
    ///
    /// True when the indices run from the policy's first index to the
    /// highest inserted index without a gap. A true answer moves the segment
    /// to [`SegmentState::Fulfilled`].
    ///
    /// # Errors
    ///
    /// - [`SegmentError::SegmentNotInitiated`] before [`Segment::initiate`]
    /// - [`SegmentError::SegmentPartsEmpty`] if no part was inserted
    pub fn fulfilled(&self) -> SegmentResult<bool> {
        let mut inner = self.inner.lock();
        self.check_readable(&inner, "fulfilled")?;

        if self.first_gap(&inner).is_some() {
            return Ok(false);
        }

        if inner.state == SegmentState::Initiated {
            debug!(path = %self.path, parts = inner.parts.len(), "segment fulfilled");
            inner.state = SegmentState::Fulfilled;
        }
        Ok(true)
    }

    /// Returns the parts in ascending index order, ready for the backend's
    /// complete call.
    ///
    /// # Errors
    ///
    /// - [`SegmentError::SegmentNotInitiated`] before [`Segment::initiate`]
    /// - [`SegmentError::SegmentPartsEmpty`] if no part was inserted
    /// - [`SegmentError::SegmentNotFulfilled`] while an index is missing
    pub fn manifest(&self) -> SegmentResult<Vec<Part>> {
        const OP: &str = "manifest";

        let mut inner = self.inner.lock();
        self.check_readable(&inner, OP)?;

        if let Some(missing) = self.first_gap(&inner) {
            return Err(SegmentError::SegmentNotFulfilled {
                op: OP,
                segment: self.describe(&inner),
                missing,
            });
        }

        inner.state = SegmentState::Consumed;
        Ok(inner.parts.values().cloned().collect())
    }

    fn check_readable(&self, inner: &Inner, op: &'static str) -> SegmentResult<()> {
        if inner.state == SegmentState::Uninitiated {
            return Err(SegmentError::SegmentNotInitiated {
                op,
                segment: self.describe(inner),
            });
        }
        if inner.parts.is_empty() {
            return Err(SegmentError::SegmentPartsEmpty {
                op,
                segment: self.describe(inner),
            });
        }
        Ok(())
    }

    /// Returns the first index missing from the run, or `None` if complete.
    fn first_gap(&self, inner: &Inner) -> Option<u32> {
        let mut expected = u64::from(self.policy.first_index);

        for &index in inner.parts.keys() {
            if u64::from(index) != expected {
                return u32::try_from(expected).ok();
            }
            expected += 1;
        }

        debug_assert!(inner
            .parts
            .values()
            .rev()
            .skip(1)
            .all(|p| p.size >= self.policy.min_size));
        None
    }

    /// Returns the number of parts inserted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().parts.len()
    }

    /// Returns true if no part was inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().parts.is_empty()
    }

    /// Returns the sum of all part sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.inner.lock().parts.values().map(|p| p.size).sum()
    }

    /// Returns the part stored at `index`.
    #[must_use]
    pub fn part(&self, index: u32) -> Option<Part> {
        self.inner.lock().parts.get(&index).cloned()
    }

    /// Returns the byte offset of the part at `index` within the object.
    ///
    /// The offset is the total size of the parts with a smaller index, so it
    /// can still move while earlier parts are missing.
    #[must_use]
    pub fn offset_of(&self, index: u32) -> Option<u64> {
        let inner = self.inner.lock();
        if !inner.parts.contains_key(&index) {
            return None;
        }
        Some(inner.parts.range(..index).map(|(_, p)| p.size).sum())
    }

    /// Returns up to `limit` indices missing below the highest inserted
    /// index, in ascending order.
    ///
    /// Only the gaps between neighbouring parts are walked, so the cost is
    /// bounded by the part count and `limit`, not by the highest index.
    #[must_use]
    pub fn missing_indices(&self, limit: usize) -> Vec<u32> {
        let inner = self.inner.lock();
        let mut missing = Vec::new();
        let mut next = u64::from(self.policy.first_index);

        for &index in inner.parts.keys() {
            let index = u64::from(index);
            while next < index && missing.len() < limit {
                // next < index <= u32::MAX
                missing.push(next as u32);
                next += 1;
            }
            if missing.len() >= limit {
                break;
            }
            next = index + 1;
        }
        missing
    }

    fn describe(&self, inner: &Inner) -> String {
        match &inner.id {
            Some(id) => format!("Segment {{Path: {}, ID: {}}}", self.path, id),
            None => format!("Segment {{Path: {}}}", self.path),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.write_str(&self.describe(&inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SegmentErrorKind;

    const MIB: u64 = 1024 * 1024;

    fn initiated() -> Segment {
        let segment = Segment::new("obj", PartPolicy::default());
        segment.initiate("u1").unwrap();
        segment
    }

    #[test]
    fn new_segment_is_uninitiated() {
        let segment = Segment::new("obj", PartPolicy::default());
        assert_eq!(segment.state(), SegmentState::Uninitiated);
        assert!(segment.id().is_none());
        assert!(segment.is_empty());
        assert_eq!(segment.to_string(), "Segment {Path: obj}");
    }

    #[test]
    fn initiate_records_id() {
        let segment = initiated();
        assert_eq!(segment.state(), SegmentState::Initiated);
        assert_eq!(segment.id().as_deref(), Some("u1"));
        assert_eq!(segment.to_string(), "Segment {Path: obj, ID: u1}");
    }

    #[test]
    fn initiate_same_id_is_noop() {
        let segment = initiated();
        segment.insert_part(Part::new(1, 5 * MIB)).unwrap();
        segment.initiate("u1").unwrap();
        assert_eq!(segment.len(), 1);
    }

    #[test]
    fn initiate_different_id_fails() {
        let segment = initiated();
        let err = segment.initiate("u2").unwrap_err();
        assert_eq!(err.kind(), SegmentErrorKind::SegmentInitiated);
        assert_eq!(segment.id().as_deref(), Some("u1"));
    }

    #[test]
    fn insert_before_initiate_fails() {
        let segment = Segment::new("obj", PartPolicy::default());
        let err = segment.insert_part(Part::new(1, 5 * MIB)).unwrap_err();
        assert_eq!(err.kind(), SegmentErrorKind::SegmentNotInitiated);
        assert_eq!(err.op(), "insert_part");

        segment.initiate("u1").unwrap();
        segment.insert_part(Part::new(1, 5 * MIB)).unwrap();
    }

    #[test]
    fn out_of_order_scenario() {
        let segment = initiated();
        segment.insert_part(Part::new(2, 5 * MIB)).unwrap();
        segment.insert_part(Part::new(1, 5 * MIB)).unwrap();
        segment.insert_part(Part::new(3, MIB)).unwrap();

        assert!(segment.fulfilled().unwrap());
        assert_eq!(segment.state(), SegmentState::Fulfilled);

        let manifest = segment.manifest().unwrap();
        let indices: Vec<u32> = manifest.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(manifest.iter().map(|p| p.size).sum::<u64>(), 11 * MIB);
        assert_eq!(segment.state(), SegmentState::Consumed);
    }

    #[test]
    fn undersized_non_tail_fails() {
        let segment = initiated();
        segment.insert_part(Part::new(2, 5 * MIB)).unwrap();

        let err = segment.insert_part(Part::new(1, 3 * MIB)).unwrap_err();
        assert_eq!(err.kind(), SegmentErrorKind::PartSizeInvalid);
        assert!(matches!(
            err,
            SegmentError::PartSizeInvalid {
                violation: SizeViolation::BelowMinimum { .. },
                ..
            }
        ));
        assert_eq!(segment.len(), 1);
    }

    #[test]
    fn undersized_tail_blocks_later_index() {
        let segment = initiated();
        segment.insert_part(Part::new(1, MIB)).unwrap();

        let err = segment.insert_part(Part::new(2, 5 * MIB)).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::PartSizeInvalid {
                violation: SizeViolation::TailDisplaced { tail: 1, .. },
                ..
            }
        ));
        assert!(segment.part(2).is_none());
    }

    #[test]
    fn zero_and_oversized_parts_fail() {
        let segment = Segment::new("obj", PartPolicy::new().min_size(4).max_size(8));
        segment.initiate("u1").unwrap();

        let zero = segment.insert_part(Part::new(1, 0)).unwrap_err();
        assert!(matches!(
            zero,
            SegmentError::PartSizeInvalid {
                violation: SizeViolation::Zero,
                ..
            }
        ));

        let big = segment.insert_part(Part::new(1, 9)).unwrap_err();
        assert!(matches!(
            big,
            SegmentError::PartSizeInvalid {
                violation: SizeViolation::AboveMaximum { max: 8 },
                ..
            }
        ));

        segment.insert_part(Part::new(1, 8)).unwrap();
    }

    #[test]
    fn index_outside_policy_fails() {
        let segment = Segment::new("obj", PartPolicy::new().first_index(1).max_parts(2));
        segment.initiate("u1").unwrap();

        for index in [0, 3] {
            let err = segment.insert_part(Part::new(index, 5 * MIB)).unwrap_err();
            assert_eq!(err.kind(), SegmentErrorKind::PartIndexInvalid);
        }
        assert!(segment.is_empty());
    }

    #[test]
    fn reinsert_same_size_is_idempotent() {
        let segment = initiated();
        segment.insert_part(Part::new(1, 5 * MIB).with_etag("a")).unwrap();
        segment.insert_part(Part::new(1, 5 * MIB).with_etag("b")).unwrap();

        assert_eq!(segment.len(), 1);
        assert_eq!(segment.part(1).unwrap().etag.as_deref(), Some("a"));
    }

    #[test]
    fn reinsert_different_size_intersects() {
        let segment = initiated();
        segment.insert_part(Part::new(1, 5 * MIB)).unwrap();
        segment.insert_part(Part::new(2, 6 * MIB)).unwrap();

        let err = segment.insert_part(Part::new(1, 7 * MIB)).unwrap_err();
        match err {
            SegmentError::PartIntersected { part, existing, .. } => {
                assert_eq!(part, Part::new(1, 7 * MIB));
                assert_eq!(existing, Part::new(1, 5 * MIB));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(segment.total_size(), 11 * MIB);
    }

    #[test]
    fn fulfilled_on_empty_segment_fails() {
        let segment = initiated();
        let err = segment.fulfilled().unwrap_err();
        assert_eq!(err.kind(), SegmentErrorKind::SegmentPartsEmpty);
    }

    #[test]
    fn fulfilled_before_initiate_fails() {
        let segment = Segment::new("obj", PartPolicy::default());
        let err = segment.fulfilled().unwrap_err();
        assert_eq!(err.kind(), SegmentErrorKind::SegmentNotInitiated);
    }

    #[test]
    fn gap_keeps_segment_unfulfilled() {
        let segment = initiated();
        segment.insert_part(Part::new(1, 5 * MIB)).unwrap();
        segment.insert_part(Part::new(3, 5 * MIB)).unwrap();

        assert!(!segment.fulfilled().unwrap());
        assert_eq!(segment.missing_indices(10), vec![2]);

        let err = segment.manifest().unwrap_err();
        assert!(matches!(
            err,
            SegmentError::SegmentNotFulfilled { missing: 2, .. }
        ));
        assert_eq!(segment.state(), SegmentState::Initiated);

        segment.insert_part(Part::new(2, 5 * MIB)).unwrap();
        assert!(segment.fulfilled().unwrap());
    }

    #[test]
    fn missing_first_index_is_a_gap() {
        let segment = initiated();
        segment.insert_part(Part::new(2, 5 * MIB)).unwrap();
        assert!(!segment.fulfilled().unwrap());
        assert_eq!(segment.missing_indices(10), vec![1]);
    }

    #[test]
    fn missing_indices_stop_at_limit() {
        let segment = Segment::new("sparse", PartPolicy::new().min_size(1));
        segment.initiate("upload-1").unwrap();
        segment.insert_part(Part::new(2, 1)).unwrap();
        segment.insert_part(Part::new(u32::MAX, 1)).unwrap();

        assert_eq!(segment.missing_indices(4), vec![1, 3, 4, 5]);
        assert!(segment.missing_indices(0).is_empty());
    }

    #[test]
    fn missing_indices_skip_present_parts() {
        let segment = initiated();
        for index in [2, 3, 6] {
            segment.insert_part(Part::new(index, 5 * MIB)).unwrap();
        }
        assert_eq!(segment.missing_indices(usize::MAX), vec![1, 4, 5]);
    }

    #[test]
    fn fulfilled_segment_rejects_new_index() {
        let segment = initiated();
        segment.insert_part(Part::new(1, 5 * MIB)).unwrap();
        assert!(segment.fulfilled().unwrap());

        let err = segment.insert_part(Part::new(2, 5 * MIB)).unwrap_err();
        assert_eq!(err.kind(), SegmentErrorKind::SegmentFulfilled);

        segment.insert_part(Part::new(1, 5 * MIB)).unwrap();
        assert_eq!(segment.len(), 1);
    }

    #[test]
    fn manifest_can_be_read_again() {
        let segment = initiated();
        segment.insert_part(Part::new(1, MIB)).unwrap();

        let first = segment.manifest().unwrap();
        let second = segment.manifest().unwrap();
        assert_eq!(first, second);
        assert_eq!(segment.state(), SegmentState::Consumed);
    }

    #[test]
    fn offsets_follow_index_rank() {
        let segment = initiated();
        segment.insert_part(Part::new(3, 2 * MIB)).unwrap();
        segment.insert_part(Part::new(1, 5 * MIB)).unwrap();

        assert_eq!(segment.offset_of(1), Some(0));
        assert_eq!(segment.offset_of(3), Some(5 * MIB));

        segment.insert_part(Part::new(2, 6 * MIB)).unwrap();
        assert_eq!(segment.offset_of(3), Some(11 * MIB));
        assert_eq!(segment.offset_of(4), None);
    }

    #[test]
    fn zero_based_policy() {
        let segment = Segment::new("obj", PartPolicy::new().first_index(0).min_size(1));
        segment.initiate("u1").unwrap();
        segment.insert_part(Part::new(1, 1)).unwrap();
        assert!(!segment.fulfilled().unwrap());
        segment.insert_part(Part::new(0, 1)).unwrap();
        assert!(segment.fulfilled().unwrap());
    }
}
