//! Local file system adapter.

use crate::config::StorageConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::object::{content_etag, Object, ObjectMode, StorageMeta};
use crate::traits::{Multiparter, Servicer, Storager};
use bytes::Bytes;
use objstore_segment::{Part, PartPolicy};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Service type of the file system adapter.
pub const TYPE: &str = "fs";

/// Directory under the root where uploads stage their parts.
pub const MULTIPART_DIR: &str = ".multipart";

/// File inside an upload's staging directory that receives the object
/// while it is assembled.
const ASSEMBLING: &str = ".assembling";

/// A storager rooted at a local directory.
///
/// Object paths map to files below the root. Parts of a multipart upload
/// are staged as `.multipart/<upload id>/<index>` and concatenated on
/// completion.
///
/// # Durability
///
/// Completed objects are assembled inside the staging directory, synced
/// with `File::sync_all()` and renamed onto their path, so a failed
/// completion never replaces an existing object.
///
/// # Example
///
/// ```no_run
/// use objstore_services::{FsStorage, Storager};
///
/// let store = FsStorage::open("/tmp/objstore").unwrap();
/// store.write("a/b.txt", b"persistent data").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    policy: PartPolicy,
}

impl FsStorage {
    /// Opens a storager at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> ServiceResult<Self> {
        Self::open_with_policy(root, PartPolicy::default())
    }

    /// Opens a storager from a configuration; `work_dir` is the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(config: &StorageConfig) -> ServiceResult<Self> {
        Self::open_with_policy(&config.work_dir, config.part_policy)
    }

    fn open_with_policy(root: impl AsRef<Path>, policy: PartPolicy) -> ServiceResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            policy,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn upload_dir(&self, id: &str) -> PathBuf {
        self.root.join(MULTIPART_DIR).join(id)
    }

    fn format_error(&self, op: &'static str, err: impl Into<ServiceError>, path: &str) -> ServiceError {
        err.into().context(op, self.metadata(), &[path])
    }

    fn object_for(&self, path: &str, file: &Path) -> ServiceResult<Object> {
        let meta = fs::metadata(file)?;
        let id = file.to_string_lossy();
        if meta.is_dir() {
            return Ok(Object::new(id, path, ObjectMode::Dir));
        }
        Ok(Object::new(id, path, ObjectMode::Read).with_content_length(meta.len()))
    }

    /// Returns the staging directory of an upload, which must exist.
    fn existing_upload(&self, object: &Object) -> ServiceResult<PathBuf> {
        let id = object.require_multipart_id()?;
        let dir = self.upload_dir(id);
        if !dir.is_dir() {
            return Err(ServiceError::ObjectNotExist(format!("upload {id}")));
        }
        Ok(dir)
    }

    fn read_part(dir: &Path, index: u32) -> ServiceResult<Part> {
        let data = fs::read(dir.join(index.to_string()))?;
        Ok(Part::new(index, data.len() as u64).with_etag(content_etag(&data)))
    }

    /// Checks every staged part against the manifest before anything is
    /// written, then builds the object next to the parts and renames it onto
    /// `target`. A failed completion leaves `target` untouched.
    fn assemble(dir: &Path, target: &Path, manifest: &[Part]) -> ServiceResult<u64> {
        for part in manifest {
            let staged = dir.join(part.index.to_string());
            if !staged.is_file() {
                return Err(ServiceError::ObjectNotExist(format!("part {}", part.index)));
            }
            let found = Self::read_part(dir, part.index)?;
            if found.size != part.size {
                return Err(ServiceError::Unexpected(format!(
                    "part {} has {} bytes, manifest lists {}",
                    part.index, found.size, part.size
                )));
            }
            if part.etag.is_some() && part.etag != found.etag {
                return Err(ServiceError::Unexpected(format!(
                    "part {} etag mismatch",
                    part.index
                )));
            }
        }

        let assembling = dir.join(ASSEMBLING);
        let mut out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&assembling)?;

        let mut written = 0u64;
        for part in manifest {
            let staged = dir.join(part.index.to_string());
            written += io::copy(&mut File::open(&staged)?, &mut out)?;
        }
        out.flush()?;
        out.sync_all()?;
        drop(out);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&assembling, target)?;
        Ok(written)
    }
}

impl Storager for FsStorage {
    fn metadata(&self) -> StorageMeta {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        StorageMeta {
            service: TYPE,
            name,
            work_dir: self.root.to_string_lossy().into_owned(),
        }
    }

    fn read(&self, path: &str) -> ServiceResult<Bytes> {
        fs::read(self.file_path(path))
            .map(Bytes::from)
            .map_err(|err| self.format_error("read", err, path))
    }

    fn write(&self, path: &str, data: &[u8]) -> ServiceResult<u64> {
        let file = self.file_path(path);
        let result = file
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&file, data));
        result.map_err(|err| self.format_error("write", err, path))?;
        Ok(data.len() as u64)
    }

    fn stat(&self, path: &str) -> ServiceResult<Object> {
        self.object_for(path, &self.file_path(path))
            .map_err(|err| self.format_error("stat", err, path))
    }

    fn delete(&self, path: &str) -> ServiceResult<()> {
        match fs::remove_file(self.file_path(path)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.format_error("delete", err, path)),
        }
    }

    fn list(&self, prefix: &str) -> ServiceResult<Vec<Object>> {
        let (dir, name_prefix) = match prefix.rsplit_once('/') {
            Some((dir, rest)) => (format!("{dir}/"), rest),
            None => (String::new(), prefix),
        };

        let entries = match fs::read_dir(self.file_path(&dir)) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.format_error("list", err, prefix)),
        };

        let mut objects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| self.format_error("list", err, prefix))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == MULTIPART_DIR || !name.starts_with(name_prefix) {
                continue;
            }
            let path = format!("{dir}{name}");
            let object = self
                .object_for(&path, &entry.path())
                .map_err(|err| self.format_error("list", err, prefix))?;
            objects.push(object);
        }

        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }

    fn as_multiparter(&self) -> Option<&dyn Multiparter> {
        Some(self)
    }
}

impl Multiparter for FsStorage {
    fn part_policy(&self) -> PartPolicy {
        self.policy
    }

    fn create_multipart(&self, path: &str) -> ServiceResult<Object> {
        let id = Uuid::new_v4().to_string();
        let dir = self.upload_dir(&id);
        fs::create_dir_all(&dir).map_err(|err| self.format_error("create_multipart", err, path))?;
        debug!(path = %path, id = %id, "multipart upload created");

        Ok(Object::new(dir.to_string_lossy(), path, ObjectMode::Part).with_multipart_id(id))
    }

    fn write_multipart(&self, object: &Object, index: u32, data: &[u8]) -> ServiceResult<Part> {
        let result = self.existing_upload(object).and_then(|dir| {
            fs::write(dir.join(index.to_string()), data)?;
            Ok(Part::new(index, data.len() as u64).with_etag(content_etag(data)))
        });
        result.map_err(|err| self.format_error("write_multipart", err, &object.path))
    }

    fn list_multipart(&self, object: &Object) -> ServiceResult<Vec<Part>> {
        let result = self.existing_upload(object).and_then(|dir| {
            let mut parts = Vec::new();
            for entry in fs::read_dir(&dir)? {
                let name = entry?.file_name();
                // Anything that is not a part index is not ours.
                let Ok(index) = name.to_string_lossy().parse::<u32>() else {
                    continue;
                };
                parts.push(Self::read_part(&dir, index)?);
            }
            parts.sort_by_key(|p| p.index);
            Ok(parts)
        });
        result.map_err(|err| self.format_error("list_multipart", err, &object.path))
    }

    fn complete_multipart(&self, object: &Object, manifest: &[Part]) -> ServiceResult<Object> {
        let target = self.file_path(&object.path);
        let result = self.existing_upload(object).and_then(|dir| {
            Self::assemble(&dir, &target, manifest)?;
            fs::remove_dir_all(&dir)?;
            self.object_for(&object.path, &target)
        });

        let completed = result.map_err(|err| self.format_error("complete_multipart", err, &object.path))?;
        debug!(path = %object.path, parts = manifest.len(), "multipart upload completed");
        Ok(completed)
    }

    fn abort_multipart(&self, object: &Object) -> ServiceResult<()> {
        let result = self
            .existing_upload(object)
            .and_then(|dir| Ok(fs::remove_dir_all(dir)?));
        result.map_err(|err| self.format_error("abort_multipart", err, &object.path))
    }
}

/// A servicer whose storagers are the subdirectories of a root directory.
#[derive(Debug, Clone)]
pub struct FsService {
    root: PathBuf,
    policy: PartPolicy,
}

impl FsService {
    /// Opens a servicer; `work_dir` is the root directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created.
    pub fn new(config: &StorageConfig) -> ServiceResult<Self> {
        let root = PathBuf::from(&config.work_dir);
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            policy: config.part_policy,
        })
    }

    fn format_error(&self, op: &'static str, err: impl Into<ServiceError>) -> ServiceError {
        err.into()
            .context(op, format!("Servicer fs {{Root: {}}}", self.root.display()), &[])
    }
}

impl Servicer for FsService {
    fn create(&self, name: &str) -> ServiceResult<Arc<dyn Storager>> {
        let store = FsStorage::open_with_policy(self.root.join(name), self.policy)
            .map_err(|err| self.format_error("create", err))?;
        Ok(Arc::new(store))
    }

    fn get(&self, name: &str) -> ServiceResult<Arc<dyn Storager>> {
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(self.format_error("get", ServiceError::ObjectNotExist(name.to_string())));
        }
        Ok(Arc::new(FsStorage {
            root: dir,
            policy: self.policy,
        }))
    }

    fn delete(&self, name: &str) -> ServiceResult<()> {
        fs::remove_dir_all(self.root.join(name)).map_err(|err| self.format_error("delete", err))
    }

    fn list(&self) -> ServiceResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|err| self.format_error("list", err))? {
            let entry = entry.map_err(|err| self.format_error("list", err))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
