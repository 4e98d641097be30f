//! Driving a multipart upload against a storager.

use crate::error::{ServiceError, ServiceResult};
use crate::object::Object;
use crate::traits::{Multiparter, Storager};
use objstore_segment::{Part, Segment, SegmentError, SegmentErrorKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// One multipart upload: the remote upload plus the [`Segment`] tracking it.
///
/// Each part is transferred first and recorded in the segment only after
/// the backend accepted it. When the segment rejects a part, or reports an
/// error while completing, the remote upload is aborted before the error is
/// returned. Sending an index again with a different payload is a conflict
/// too: the backend already holds the new bytes while the segment still
/// records the old part, so the upload could never complete.
///
/// `write_part` takes `&self`, so one upload can be shared by many threads,
/// each sending different parts.
///
/// # Example
///
/// ```rust
/// use objstore_segment::PartPolicy;
/// use objstore_services::{MemoryStorage, MultipartUpload, StorageConfig, Storager};
/// use std::sync::Arc;
///
/// let config = StorageConfig::new()
///     .name("bucket")
///     .part_policy(PartPolicy::new().min_size(4));
/// let store = Arc::new(MemoryStorage::new(&config).unwrap());
///
/// let upload = MultipartUpload::start(store.clone(), "greeting").unwrap();
/// upload.write_part(2, b"world").unwrap();
/// upload.write_part(1, b"hello ").unwrap();
/// upload.complete().unwrap();
///
/// assert_eq!(&store.read("greeting").unwrap()[..], b"hello world");
/// ```
pub struct MultipartUpload {
    storage: Arc<dyn Storager>,
    object: Object,
    segment: Segment,
}

impl MultipartUpload {
    /// Creates the remote upload and an initiated segment for it.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityMissing` if the storager has no multipart support,
    /// or the backend's error if the upload cannot be created.
    pub fn start(storage: Arc<dyn Storager>, path: &str) -> ServiceResult<Self> {
        let multiparter = storage
            .as_multiparter()
            .ok_or(ServiceError::CapabilityMissing("multipart"))?;

        let object = multiparter.create_multipart(path)?;
        let segment = Segment::new(path, multiparter.part_policy());
        segment.initiate(object.require_multipart_id()?)?;

        Ok(Self {
            storage,
            object,
            segment,
        })
    }

    /// Returns the remote upload object.
    #[must_use]
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Returns the segment tracking this upload.
    #[must_use]
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    fn multiparter(&self) -> ServiceResult<&dyn Multiparter> {
        self.storage
            .as_multiparter()
            .ok_or(ServiceError::CapabilityMissing("multipart"))
    }

    /// Transfers one part and records it.
    ///
    /// Resending an index with the same payload succeeds.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the transfer fails (the upload stays
    /// open), or the segment's error if it rejects the part (the upload is
    /// aborted). A payload whose etag differs from the part already recorded
    /// for `index` fails with `PartIntersected` and aborts the upload.
    pub fn write_part(&self, index: u32, data: &[u8]) -> ServiceResult<Part> {
        let part = self
            .multiparter()?
            .write_multipart(&self.object, index, data)?;

        if let Err(err) = self.segment.insert_part(part.clone()) {
            self.abort_quietly(&err);
            return Err(err.into());
        }

        // An identical size is accepted as a resend; the etag tells whether
        // the backend now holds other bytes than the segment recorded.
        if let Some(existing) = self.segment.part(index) {
            if existing.etag != part.etag {
                let err = SegmentError::PartIntersected {
                    op: "write_part",
                    segment: self.segment.to_string(),
                    part,
                    existing,
                };
                self.abort_quietly(&err);
                return Err(err.into());
            }
        }

        Ok(part)
    }

    /// Reports whether every part has been recorded.
    ///
    /// A true answer commits the part set: the segment moves to
    /// `Fulfilled`, and any later `write_part` with a new index fails with
    /// `SegmentFulfilled` and aborts the upload. Only call it once every
    /// producer is done sending parts.
    ///
    /// # Errors
    ///
    /// Returns the segment's error, e.g. when no part was written yet.
    pub fn is_fulfilled(&self) -> ServiceResult<bool> {
        Ok(self.segment.fulfilled()?)
    }

    /// Finalizes the upload from the segment's manifest.
    ///
    /// # Errors
    ///
    /// - `SegmentNotFulfilled` while parts are missing; the upload stays open
    /// - any other segment error; the upload is aborted
    /// - the backend's error if finalizing fails
    pub fn complete(&self) -> ServiceResult<Object> {
        let manifest = match self.segment.fulfilled().and_then(|_| self.segment.manifest()) {
            Ok(manifest) => manifest,
            Err(err) if err.kind() == SegmentErrorKind::SegmentNotFulfilled => {
                return Err(err.into());
            }
            Err(err) => {
                self.abort_quietly(&err);
                return Err(err.into());
            }
        };

        let completed = self
            .multiparter()?
            .complete_multipart(&self.object, &manifest)?;
        debug!(
            path = %self.object.path,
            parts = manifest.len(),
            size = self.segment.total_size(),
            "upload completed"
        );
        Ok(completed)
    }

    /// Aborts the remote upload.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the upload cannot be aborted.
    pub fn abort(&self) -> ServiceResult<()> {
        self.multiparter()?.abort_multipart(&self.object)
    }

    fn abort_quietly(&self, cause: &dyn std::error::Error) {
        warn!(path = %self.object.path, error = %cause, "aborting multipart upload");
        if let Err(err) = self.abort() {
            warn!(path = %self.object.path, error = %err, "abort failed");
        }
    }

    /// Uploads `data` as consecutive parts of `part_size` bytes.
    ///
    /// Empty data is stored with a single plain write, since an upload
    /// without parts cannot be completed.
    ///
    /// The upload is aborted on any error after it was started, since no
    /// other handle to it exists.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`MultipartUpload::start`],
    /// [`MultipartUpload::write_part`] or [`MultipartUpload::complete`].
    pub fn upload_all(
        storage: Arc<dyn Storager>,
        path: &str,
        data: &[u8],
        part_size: usize,
    ) -> ServiceResult<Object> {
        if data.is_empty() {
            storage.write(path, data)?;
            return storage.stat(path);
        }

        let upload = Self::start(storage, path)?;
        upload.send_all(data, part_size).map_err(|err| {
            if !upload.aborted_by(&err) {
                upload.abort_quietly(&err);
            }
            err
        })
    }

    fn send_all(&self, data: &[u8], part_size: usize) -> ServiceResult<Object> {
        let path = &self.object.path;
        let first = self.segment.policy().first_index;

        for (n, chunk) in data.chunks(part_size.max(1)).enumerate() {
            let offset = u32::try_from(n).map_err(|_| {
                ServiceError::Unexpected(format!("{path} needs more than u32::MAX parts"))
            })?;
            let index = first.checked_add(offset).ok_or_else(|| {
                ServiceError::Unexpected(format!("part index overflow for {path}"))
            })?;
            self.write_part(index, chunk)?;
        }

        self.complete()
    }

    /// Whether `err` came from a segment failure that already aborted the
    /// upload.
    fn aborted_by(&self, err: &ServiceError) -> bool {
        err.as_segment()
            .is_some_and(|err| err.kind() != SegmentErrorKind::SegmentNotFulfilled)
    }
}
