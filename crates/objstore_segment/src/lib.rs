//! # objstore Segment
//!
//! Multipart upload bookkeeping for objstore.
//!
//! A [`Segment`] tracks the parts of one in-progress multipart upload. Parts
//! may arrive in any order and from any number of threads; the segment
//! validates each one against a [`PartPolicy`], rejects conflicting parts,
//! and decides when the accumulated parts describe the whole object.
//!
//! ## Design Principles
//!
//! - A part's position is the rank of its index, never its arrival order
//! - Failed insertions have no side effects
//! - Contiguity is checked once, when fulfillment is asked for
//! - No I/O: adapters transfer bytes, the segment only keeps the books
//!
//! ## Example
//!
//! ```rust
//! use objstore_segment::{Part, PartPolicy, Segment};
//!
//! const MIB: u64 = 1024 * 1024;
//!
//! let segment = Segment::new("backups/db.tar", PartPolicy::default());
//! segment.initiate("upload-1").unwrap();
//!
//! segment.insert_part(Part::new(2, 5 * MIB)).unwrap();
//! segment.insert_part(Part::new(1, 5 * MIB)).unwrap();
//! segment.insert_part(Part::new(3, MIB)).unwrap();
//!
//! assert!(segment.fulfilled().unwrap());
//! let manifest = segment.manifest().unwrap();
//! assert_eq!(manifest.iter().map(|p| p.index).collect::<Vec<_>>(), vec![1, 2, 3]);
//! assert_eq!(segment.total_size(), 11 * MIB);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod part;
mod policy;
mod segment;

pub use error::{SegmentError, SegmentErrorKind, SegmentResult, SizeViolation};
pub use part::Part;
pub use policy::{PartPolicy, DEFAULT_FIRST_INDEX, DEFAULT_MAX_PART_SIZE, DEFAULT_MIN_PART_SIZE};
pub use segment::{Segment, SegmentState};
