//! The unified storage surface every adapter implements.

use crate::error::ServiceResult;
use crate::object::{Object, StorageMeta};
use bytes::Bytes;
use objstore_segment::{Part, PartPolicy};
use std::sync::Arc;

/// Manages the storagers (buckets) of one backend.
pub trait Servicer: Send + Sync {
    /// Creates a storager, or returns the existing one with that name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the creation.
    fn create(&self, name: &str) -> ServiceResult<Arc<dyn Storager>>;

    /// Returns an existing storager.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotExist` if no storager has that name.
    fn get(&self, name: &str) -> ServiceResult<Arc<dyn Storager>>;

    /// Deletes a storager.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotExist` if no storager has that name.
    fn delete(&self, name: &str) -> ServiceResult<()>;

    /// Lists storager names in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be listed.
    fn list(&self) -> ServiceResult<Vec<String>>;
}

/// Object operations within one storager.
///
/// Paths are relative to the storager's work dir.
pub trait Storager: Send + Sync {
    /// Returns the storager's name and work dir.
    fn metadata(&self) -> StorageMeta;

    /// Reads a whole object.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotExist` if the object is missing.
    fn read(&self, path: &str) -> ServiceResult<Bytes>;

    /// Writes a whole object, replacing any previous content.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the write.
    fn write(&self, path: &str, data: &[u8]) -> ServiceResult<u64>;

    /// Returns an object's metadata.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotExist` if the object is missing.
    fn stat(&self, path: &str) -> ServiceResult<Object>;

    /// Deletes an object. Deleting a missing object succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    fn delete(&self, path: &str) -> ServiceResult<()>;

    /// Lists objects whose path starts with `prefix`, in path order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be listed.
    fn list(&self, prefix: &str) -> ServiceResult<Vec<Object>>;

    /// Returns the multipart capability, if the storager has one.
    fn as_multiparter(&self) -> Option<&dyn Multiparter> {
        None
    }
}

/// Multipart upload support.
///
/// The adapter transfers and stores part data; completeness of an upload is
/// tracked by an [`objstore_segment::Segment`] owned by the caller, see
/// [`crate::MultipartUpload`].
pub trait Multiparter: Storager {
    /// Returns the part limits of this backend.
    fn part_policy(&self) -> PartPolicy;

    /// Starts an upload to `path`.
    ///
    /// The returned object has [`crate::ObjectMode::Part`] and carries the
    /// upload id in `multipart_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the upload.
    fn create_multipart(&self, path: &str) -> ServiceResult<Object>;

    /// Stores the data of one part, replacing any earlier data at `index`.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotExist` if the upload is unknown.
    fn write_multipart(&self, object: &Object, index: u32, data: &[u8]) -> ServiceResult<Part>;

    /// Lists the parts stored so far, by ascending index.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotExist` if the upload is unknown.
    fn list_multipart(&self, object: &Object) -> ServiceResult<Vec<Part>>;

    /// Assembles the parts of `manifest`, in order, into the final object.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotExist` if the upload or a listed part is unknown,
    /// and `Unexpected` if a listed part differs from the stored one.
    fn complete_multipart(&self, object: &Object, manifest: &[Part]) -> ServiceResult<Object>;

    /// Discards an upload and its parts.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotExist` if the upload is unknown.
    fn abort_multipart(&self, object: &Object) -> ServiceResult<()>;
}
