//! # objstore Testkit
//!
//! Test utilities for objstore.
//!
//! This crate provides:
//! - Storager fixtures with automatic cleanup
//! - Property-based part generators using proptest
//! - Concurrent stress drivers for segments and uploads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use objstore_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_each_store(|store| {
//!         store.write("k", b"v").unwrap();
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
