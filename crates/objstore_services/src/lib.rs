//! # objstore Services
//!
//! The unified storage surface of objstore and its reference adapters.
//!
//! Every backend is reached through the same traits:
//!
//! - [`Servicer`] manages the storagers (buckets) of a backend
//! - [`Storager`] reads, writes, lists and deletes objects
//! - [`Multiparter`] transfers the parts of multipart uploads
//!
//! Completeness of a multipart upload is not the adapter's business: a
//! [`MultipartUpload`] pairs the remote upload with an
//! [`objstore_segment::Segment`] that validates each part and produces the
//! manifest the adapter finalizes with.
//!
//! ## Available Adapters
//!
//! - [`MemoryStorage`] / [`MemoryService`] - objects in process memory
//! - [`FsStorage`] / [`FsService`] - objects as files under a directory
//!
//! Adapters are selected by name through a [`Registry`].
//!
//! ## Example
//!
//! ```rust
//! use objstore_segment::PartPolicy;
//! use objstore_services::{MultipartUpload, Registry, StorageConfig};
//!
//! let registry = Registry::with_builtin();
//! let config = StorageConfig::new()
//!     .name("bucket")
//!     .part_policy(PartPolicy::new().min_size(8));
//! let store = registry.new_storager("memory", &config).unwrap();
//!
//! let data = vec![7u8; 20];
//! MultipartUpload::upload_all(store.clone(), "blob", &data, 8).unwrap();
//! assert_eq!(store.stat("blob").unwrap().content_length, Some(20));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod fs;
pub mod memory;
mod object;
mod registry;
mod traits;
mod translate;
mod upload;

pub use config::StorageConfig;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use fs::{FsService, FsStorage};
pub use memory::{MemoryService, MemoryStorage};
pub use object::{abs_path, content_etag, rel_path, Object, ObjectMode, StorageMeta};
pub use registry::{Factory, FsFactory, MemoryFactory, Registry};
pub use traits::{Multiparter, Servicer, Storager};
pub use translate::{ErrorTable, IO_ERRORS};
pub use upload::MultipartUpload;
