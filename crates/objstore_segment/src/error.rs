//! Error types for segment operations.

use crate::part::Part;
use std::fmt;
use thiserror::Error;

/// Result type for segment operations.
pub type SegmentResult<T> = Result<T, SegmentError>;

/// Why a part's size was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeViolation {
    /// The part is empty.
    Zero,
    /// The part is larger than the policy allows.
    AboveMaximum {
        /// The configured maximum.
        max: u64,
    },
    /// The part is smaller than the minimum and is not the last part.
    BelowMinimum {
        /// The configured minimum.
        min: u64,
    },
    /// The part would follow an undersized part, which then stops being last.
    TailDisplaced {
        /// Index of the undersized part.
        tail: u32,
        /// The configured minimum.
        min: u64,
    },
}

impl fmt::Display for SizeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "size is zero"),
            Self::AboveMaximum { max } => write!(f, "size exceeds maximum {max}"),
            Self::BelowMinimum { min } => {
                write!(f, "size below minimum {min} for a non-tail part")
            }
            Self::TailDisplaced { tail, min } => {
                write!(f, "part {tail} is below minimum {min} and must stay last")
            }
        }
    }
}

/// Errors that can occur while tracking a multipart upload.
///
/// Every variant names the operation that failed and the segment it failed
/// on; variants caused by a specific part carry that part too.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// A part's size violates the policy bounds.
    #[error("{op}: {segment}, {part}: part size invalid: {violation}")]
    PartSizeInvalid {
        /// The failed operation.
        op: &'static str,
        /// The segment description.
        segment: String,
        /// The rejected part.
        part: Part,
        /// Which bound was violated.
        violation: SizeViolation,
    },

    /// A part conflicts with a part already accepted at the same index.
    #[error("{op}: {segment}, {part}: part intersected with {existing}")]
    PartIntersected {
        /// The failed operation.
        op: &'static str,
        /// The segment description.
        segment: String,
        /// The rejected part.
        part: Part,
        /// The part already present.
        existing: Part,
    },

    /// A part's index is outside the range the policy allows.
    #[error("{op}: {segment}, {part}: part index invalid")]
    PartIndexInvalid {
        /// The failed operation.
        op: &'static str,
        /// The segment description.
        segment: String,
        /// The rejected part.
        part: Part,
    },

    /// The segment was used before being initiated.
    #[error("{op}: {segment}: segment not initiated")]
    SegmentNotInitiated {
        /// The failed operation.
        op: &'static str,
        /// The segment description.
        segment: String,
    },

    /// The segment was initiated again with a different upload id.
    #[error("{op}: {segment}: segment already initiated, refusing id {requested}")]
    SegmentInitiated {
        /// The failed operation.
        op: &'static str,
        /// The segment description.
        segment: String,
        /// The upload id of the rejected call.
        requested: String,
    },

    /// Fulfillment or the manifest was requested with no parts inserted.
    #[error("{op}: {segment}: segment parts are empty")]
    SegmentPartsEmpty {
        /// The failed operation.
        op: &'static str,
        /// The segment description.
        segment: String,
    },

    /// The manifest was requested while parts are still missing.
    #[error("{op}: {segment}: segment not fulfilled, part {missing} is missing")]
    SegmentNotFulfilled {
        /// The failed operation.
        op: &'static str,
        /// The segment description.
        segment: String,
        /// The first missing index.
        missing: u32,
    },

    /// A new part arrived after the segment was fulfilled.
    #[error("{op}: {segment}, {part}: segment already fulfilled")]
    SegmentFulfilled {
        /// The failed operation.
        op: &'static str,
        /// The segment description.
        segment: String,
        /// The rejected part.
        part: Part,
    },
}

/// The kind of a [`SegmentError`], for matching without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentErrorKind {
    /// See [`SegmentError::PartSizeInvalid`].
    PartSizeInvalid,
    /// See [`SegmentError::PartIntersected`].
    PartIntersected,
    /// See [`SegmentError::PartIndexInvalid`].
    PartIndexInvalid,
    /// See [`SegmentError::SegmentNotInitiated`].
    SegmentNotInitiated,
    /// See [`SegmentError::SegmentInitiated`].
    SegmentInitiated,
    /// See [`SegmentError::SegmentPartsEmpty`].
    SegmentPartsEmpty,
    /// See [`SegmentError::SegmentNotFulfilled`].
    SegmentNotFulfilled,
    /// See [`SegmentError::SegmentFulfilled`].
    SegmentFulfilled,
}

impl SegmentError {
    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> SegmentErrorKind {
        match self {
            Self::PartSizeInvalid { .. } => SegmentErrorKind::PartSizeInvalid,
            Self::PartIntersected { .. } => SegmentErrorKind::PartIntersected,
            Self::PartIndexInvalid { .. } => SegmentErrorKind::PartIndexInvalid,
            Self::SegmentNotInitiated { .. } => SegmentErrorKind::SegmentNotInitiated,
            Self::SegmentInitiated { .. } => SegmentErrorKind::SegmentInitiated,
            Self::SegmentPartsEmpty { .. } => SegmentErrorKind::SegmentPartsEmpty,
            Self::SegmentNotFulfilled { .. } => SegmentErrorKind::SegmentNotFulfilled,
            Self::SegmentFulfilled { .. } => SegmentErrorKind::SegmentFulfilled,
        }
    }

    /// Returns the name of the operation that failed.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::PartSizeInvalid { op, .. }
            | Self::PartIntersected { op, .. }
            | Self::PartIndexInvalid { op, .. }
            | Self::SegmentNotInitiated { op, .. }
            | Self::SegmentInitiated { op, .. }
            | Self::SegmentPartsEmpty { op, .. }
            | Self::SegmentNotFulfilled { op, .. }
            | Self::SegmentFulfilled { op, .. } => op,
        }
    }

    /// Returns the description of the segment the error occurred on.
    #[must_use]
    pub fn segment(&self) -> &str {
        match self {
            Self::PartSizeInvalid { segment, .. }
            | Self::PartIntersected { segment, .. }
            | Self::PartIndexInvalid { segment, .. }
            | Self::SegmentNotInitiated { segment, .. }
            | Self::SegmentInitiated { segment, .. }
            | Self::SegmentPartsEmpty { segment, .. }
            | Self::SegmentNotFulfilled { segment, .. }
            | Self::SegmentFulfilled { segment, .. } => segment,
        }
    }

    /// Returns the offending part, if the error was caused by one.
    #[must_use]
    pub fn part(&self) -> Option<&Part> {
        match self {
            Self::PartSizeInvalid { part, .. }
            | Self::PartIntersected { part, .. }
            | Self::PartIndexInvalid { part, .. }
            | Self::SegmentFulfilled { part, .. } => Some(part),
            _ => None,
        }
    }
}
