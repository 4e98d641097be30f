//! Object metadata and path helpers.

use crate::error::{ServiceError, ServiceResult};
use sha2::{Digest, Sha256};
use std::fmt;

/// What an [`Object`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectMode {
    /// A readable object.
    Read,
    /// A directory or common prefix.
    Dir,
    /// An in-progress multipart upload.
    Part,
}

/// Metadata of an object, directory or multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Backend-native identifier (the absolute key or file path).
    pub id: String,
    /// Path relative to the storager's work dir.
    pub path: String,
    /// What the object refers to.
    pub mode: ObjectMode,
    /// Size in bytes, when known.
    pub content_length: Option<u64>,
    /// Integrity tag, when known.
    pub etag: Option<String>,
    /// Upload id, for [`ObjectMode::Part`] objects.
    pub multipart_id: Option<String>,
}

impl Object {
    /// Creates an object with no optional metadata.
    pub fn new(id: impl Into<String>, path: impl Into<String>, mode: ObjectMode) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            mode,
            content_length: None,
            etag: None,
            multipart_id: None,
        }
    }

    /// Sets the content length.
    #[must_use]
    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Sets the integrity tag.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Sets the multipart upload id.
    #[must_use]
    pub fn with_multipart_id(mut self, id: impl Into<String>) -> Self {
        self.multipart_id = Some(id.into());
        self
    }

    /// Returns the multipart upload id.
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` if the object is not a multipart upload.
    pub fn require_multipart_id(&self) -> ServiceResult<&str> {
        self.multipart_id
            .as_deref()
            .ok_or_else(|| ServiceError::Unexpected(format!("{} is not a multipart upload", self.path)))
    }
}

/// Name and work dir of a storager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageMeta {
    /// Service type, e.g. `memory`.
    pub service: &'static str,
    /// Bucket or storager name.
    pub name: String,
    /// Prefix applied to every path.
    pub work_dir: String,
}

impl fmt::Display for StorageMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Storager {} {{Name: {}, WorkDir: {}}}",
            self.service, self.name, self.work_dir
        )
    }
}

fn key_prefix(work_dir: &str) -> String {
    let prefix = work_dir.trim_start_matches('/');
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// Joins a storager-relative path onto the work dir, without a leading `/`.
#[must_use]
pub fn abs_path(work_dir: &str, path: &str) -> String {
    format!("{}{}", key_prefix(work_dir), path.trim_start_matches('/'))
}

/// Strips the work dir from an absolute key.
#[must_use]
pub fn rel_path<'a>(work_dir: &str, key: &'a str) -> &'a str {
    key.strip_prefix(key_prefix(work_dir).as_str()).unwrap_or(key)
}

/// Computes the integrity tag adapters attach to stored data.
#[must_use]
pub fn content_etag(data: &[u8]) -> String {
    Sha256::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}
