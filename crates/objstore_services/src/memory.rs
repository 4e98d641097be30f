//! In-memory adapter.

use crate::config::StorageConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::object::{abs_path, content_etag, rel_path, Object, ObjectMode, StorageMeta};
use crate::traits::{Multiparter, Servicer, Storager};
use bytes::{Bytes, BytesMut};
use objstore_segment::{Part, PartPolicy};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Service type of the in-memory adapter.
pub const TYPE: &str = "memory";

#[derive(Debug, Clone)]
struct Stored {
    data: Bytes,
    etag: String,
}

impl Stored {
    fn new(data: Bytes) -> Self {
        let etag = content_etag(&data);
        Self { data, etag }
    }
}

#[derive(Debug)]
struct Upload {
    key: String,
    parts: BTreeMap<u32, Stored>,
}

#[derive(Debug, Default)]
struct Bucket {
    objects: RwLock<BTreeMap<String, Stored>>,
    uploads: RwLock<HashMap<String, Upload>>,
}

/// A storager keeping objects in process memory.
///
/// Suitable for tests and for staging data that never needs to outlive the
/// process. Clones share the same objects.
///
/// # Thread Safety
///
/// This storager is thread-safe; parts of one upload may be written from
/// many threads at once.
///
/// # Example
///
/// ```rust
/// use objstore_services::{MemoryStorage, Storager};
///
/// let store = MemoryStorage::with_name("bucket");
/// store.write("a/b", b"hello").unwrap();
/// assert_eq!(&store.read("a/b").unwrap()[..], b"hello");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    name: String,
    work_dir: String,
    policy: PartPolicy,
    bucket: Arc<Bucket>,
}

impl MemoryStorage {
    /// Creates an empty storager from a configuration.
    ///
    /// # Errors
    ///
    /// Returns `PairRequired` if the configuration has no name.
    pub fn new(config: &StorageConfig) -> ServiceResult<Self> {
        let name = config.require_name()?;
        Ok(Self::from_parts(
            name,
            &config.work_dir,
            config.part_policy,
            Arc::default(),
        ))
    }

    /// Creates an empty storager with default settings.
    #[must_use]
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::from_parts(name, "/", PartPolicy::default(), Arc::default())
    }

    fn from_parts(
        name: impl Into<String>,
        work_dir: &str,
        policy: PartPolicy,
        bucket: Arc<Bucket>,
    ) -> Self {
        Self {
            name: name.into(),
            work_dir: work_dir.to_string(),
            policy,
            bucket,
        }
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.bucket.objects.read().len()
    }

    /// Returns the number of uploads neither completed nor aborted.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.bucket.uploads.read().len()
    }

    fn key(&self, path: &str) -> String {
        abs_path(&self.work_dir, path)
    }

    fn format_error(&self, op: &'static str, err: ServiceError, path: &str) -> ServiceError {
        err.context(op, self.metadata(), &[path])
    }

    fn object_for(&self, key: &str, stored: &Stored) -> Object {
        Object::new(key, rel_path(&self.work_dir, key), ObjectMode::Read)
            .with_content_length(stored.data.len() as u64)
            .with_etag(stored.etag.clone())
    }

    fn assemble(upload: &Upload, manifest: &[Part]) -> ServiceResult<Bytes> {
        let total = manifest.iter().map(|p| p.size as usize).sum();
        let mut data = BytesMut::with_capacity(total);

        for part in manifest {
            let stored = upload.parts.get(&part.index).ok_or_else(|| {
                ServiceError::ObjectNotExist(format!("part {} of {}", part.index, upload.key))
            })?;
            if stored.data.len() as u64 != part.size {
                return Err(ServiceError::Unexpected(format!(
                    "part {} has {} bytes, manifest lists {}",
                    part.index,
                    stored.data.len(),
                    part.size
                )));
            }
            if part.etag.as_ref().is_some_and(|etag| *etag != stored.etag) {
                return Err(ServiceError::Unexpected(format!(
                    "part {} etag mismatch",
                    part.index
                )));
            }
            data.extend_from_slice(&stored.data);
        }

        Ok(data.freeze())
    }
}

impl Storager for MemoryStorage {
    fn metadata(&self) -> StorageMeta {
        StorageMeta {
            service: TYPE,
            name: self.name.clone(),
            work_dir: self.work_dir.clone(),
        }
    }

    fn read(&self, path: &str) -> ServiceResult<Bytes> {
        let key = self.key(path);
        let objects = self.bucket.objects.read();
        match objects.get(&key) {
            Some(stored) => Ok(stored.data.clone()),
            None => Err(self.format_error("read", ServiceError::ObjectNotExist(key), path)),
        }
    }

    fn write(&self, path: &str, data: &[u8]) -> ServiceResult<u64> {
        let key = self.key(path);
        self.bucket
            .objects
            .write()
            .insert(key, Stored::new(Bytes::copy_from_slice(data)));
        Ok(data.len() as u64)
    }

    fn stat(&self, path: &str) -> ServiceResult<Object> {
        let key = self.key(path);
        let objects = self.bucket.objects.read();
        match objects.get(&key) {
            Some(stored) => Ok(self.object_for(&key, stored)),
            None => Err(self.format_error("stat", ServiceError::ObjectNotExist(key), path)),
        }
    }

    fn delete(&self, path: &str) -> ServiceResult<()> {
        self.bucket.objects.write().remove(&self.key(path));
        Ok(())
    }

    fn list(&self, prefix: &str) -> ServiceResult<Vec<Object>> {
        let key_prefix = self.key(prefix);
        let objects = self.bucket.objects.read();
        Ok(objects
            .range(key_prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&key_prefix))
            .map(|(key, stored)| self.object_for(key, stored))
            .collect())
    }

    fn as_multiparter(&self) -> Option<&dyn Multiparter> {
        Some(self)
    }
}

impl Multiparter for MemoryStorage {
    fn part_policy(&self) -> PartPolicy {
        self.policy
    }

    fn create_multipart(&self, path: &str) -> ServiceResult<Object> {
        let key = self.key(path);
        let id = Uuid::new_v4().to_string();

        self.bucket.uploads.write().insert(
            id.clone(),
            Upload {
                key: key.clone(),
                parts: BTreeMap::new(),
            },
        );
        debug!(key = %key, id = %id, "multipart upload created");

        Ok(Object::new(key, path, ObjectMode::Part).with_multipart_id(id))
    }

    fn write_multipart(&self, object: &Object, index: u32, data: &[u8]) -> ServiceResult<Part> {
        let id = object.require_multipart_id()?;
        let mut uploads = self.bucket.uploads.write();
        let Some(upload) = uploads.get_mut(id) else {
            return Err(self.format_error(
                "write_multipart",
                ServiceError::ObjectNotExist(format!("upload {id}")),
                &object.path,
            ));
        };

        let stored = Stored::new(Bytes::copy_from_slice(data));
        let part = Part::new(index, data.len() as u64).with_etag(stored.etag.clone());
        upload.parts.insert(index, stored);
        Ok(part)
    }

    fn list_multipart(&self, object: &Object) -> ServiceResult<Vec<Part>> {
        let id = object.require_multipart_id()?;
        let uploads = self.bucket.uploads.read();
        let Some(upload) = uploads.get(id) else {
            return Err(self.format_error(
                "list_multipart",
                ServiceError::ObjectNotExist(format!("upload {id}")),
                &object.path,
            ));
        };

        Ok(upload
            .parts
            .iter()
            .map(|(&index, stored)| {
                Part::new(index, stored.data.len() as u64).with_etag(stored.etag.clone())
            })
            .collect())
    }

    fn complete_multipart(&self, object: &Object, manifest: &[Part]) -> ServiceResult<Object> {
        let id = object.require_multipart_id()?;
        let mut uploads = self.bucket.uploads.write();
        let Some(upload) = uploads.get(id) else {
            return Err(self.format_error(
                "complete_multipart",
                ServiceError::ObjectNotExist(format!("upload {id}")),
                &object.path,
            ));
        };

        let data = Self::assemble(upload, manifest)
            .map_err(|err| self.format_error("complete_multipart", err, &object.path))?;
        let key = upload.key.clone();
        uploads.remove(id);
        drop(uploads);

        let stored = Stored::new(data);
        let completed = self.object_for(&key, &stored);
        self.bucket.objects.write().insert(key, stored);
        debug!(path = %object.path, id = %id, parts = manifest.len(), "multipart upload completed");

        Ok(completed)
    }

    fn abort_multipart(&self, object: &Object) -> ServiceResult<()> {
        let id = object.require_multipart_id()?;
        match self.bucket.uploads.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(self.format_error(
                "abort_multipart",
                ServiceError::ObjectNotExist(format!("upload {id}")),
                &object.path,
            )),
        }
    }
}

/// A servicer holding named in-memory storagers.
#[derive(Debug, Default)]
pub struct MemoryService {
    work_dir: String,
    policy: PartPolicy,
    buckets: RwLock<BTreeMap<String, Arc<Bucket>>>,
}

impl MemoryService {
    /// Creates a servicer whose storagers use the configured work dir and
    /// part policy.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            policy: config.part_policy,
            buckets: RwLock::default(),
        }
    }

    fn storager(&self, name: &str, bucket: Arc<Bucket>) -> Arc<dyn Storager> {
        Arc::new(MemoryStorage::from_parts(
            name,
            &self.work_dir,
            self.policy,
            bucket,
        ))
    }
}

impl Servicer for MemoryService {
    fn create(&self, name: &str) -> ServiceResult<Arc<dyn Storager>> {
        let bucket = Arc::clone(self.buckets.write().entry(name.to_string()).or_default());
        Ok(self.storager(name, bucket))
    }

    fn get(&self, name: &str) -> ServiceResult<Arc<dyn Storager>> {
        let bucket = self.buckets.read().get(name).cloned();
        match bucket {
            Some(bucket) => Ok(self.storager(name, bucket)),
            None => Err(ServiceError::ObjectNotExist(name.to_string()).context(
                "get",
                "Servicer memory",
                &[],
            )),
        }
    }

    fn delete(&self, name: &str) -> ServiceResult<()> {
        match self.buckets.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(ServiceError::ObjectNotExist(name.to_string()).context(
                "delete",
                "Servicer memory",
                &[],
            )),
        }
    }

    fn list(&self) -> ServiceResult<Vec<String>> {
        Ok(self.buckets.read().keys().cloned().collect())
    }
}
